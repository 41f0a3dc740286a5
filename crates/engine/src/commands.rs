//! Command structs for engine write operations.
//!
//! These types group parameters for ledger writes, keeping call sites
//! readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Common metadata for ledger entry creation.
#[derive(Clone, Debug)]
pub struct EntryMeta {
    pub note: Option<String>,
    pub idempotency_key: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl EntryMeta {
    #[must_use]
    pub fn new(occurred_at: DateTime<Utc>) -> Self {
        Self {
            note: None,
            idempotency_key: None,
            occurred_at,
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Append a signed entry to a family ledger.
///
/// Positive `amount_minor` records income, negative records an expense.
#[derive(Clone, Debug)]
pub struct AppendCmd {
    pub family_id: String,
    pub author_id: String,
    pub amount_minor: i64,
    pub category: String,
    pub meta: EntryMeta,
}

impl AppendCmd {
    #[must_use]
    pub fn new(
        family_id: impl Into<String>,
        author_id: impl Into<String>,
        amount_minor: i64,
        category: impl Into<String>,
        meta: EntryMeta,
    ) -> Self {
        Self {
            family_id: family_id.into(),
            author_id: author_id.into(),
            amount_minor,
            category: category.into(),
            meta,
        }
    }
}

/// Replace an existing entry with a corrected version.
///
/// The original is soft-deleted and the replacement carries an audit link
/// back to it.
#[derive(Clone, Debug)]
pub struct AmendCmd {
    pub family_id: String,
    pub transaction_id: Uuid,
    pub requester_id: String,
    pub amount_minor: i64,
    pub category: String,
    pub meta: EntryMeta,
}

impl AmendCmd {
    #[must_use]
    pub fn new(
        family_id: impl Into<String>,
        transaction_id: Uuid,
        requester_id: impl Into<String>,
        amount_minor: i64,
        category: impl Into<String>,
        meta: EntryMeta,
    ) -> Self {
        Self {
            family_id: family_id.into(),
            transaction_id,
            requester_id: requester_id.into(),
            amount_minor,
            category: category.into(),
            meta,
        }
    }
}
