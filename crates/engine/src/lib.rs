//! Shared-ledger and budget engine for household budgeting.
//!
//! The engine keeps one append-only ledger per family, recomputes every
//! derived figure (balances, budget utilization) from that ledger, and gates
//! writes through family membership roles. Chat gateways call into it with
//! resolved user ids and structured arguments; the engine never parses or
//! formats chat text.
//!
//! All mutating operations for a family serialize behind a per-family lock
//! and run inside one database transaction, so concurrent entries from
//! different family members interleave safely and reads never observe a
//! partial write.

pub use budget_limits::{BudgetLimit, BudgetScope, Utilization};
pub use commands::{AmendCmd, AppendCmd, EntryMeta};
pub use currency::Currency;
pub use error::EngineError;
pub use families::{Family, FamilyStatistics};
pub use members::{Member, MemberRole, MemberState};
pub use ops::{Engine, EngineBuilder, LedgerFilter};
pub use period::Period;
pub use transactions::Transaction;

mod budget_limits;
mod commands;
mod currency;
mod error;
mod families;
mod members;
mod ops;
mod period;
mod transactions;

type ResultEngine<T> = Result<T, EngineError>;
