use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sea_orm::DatabaseConnection;

use crate::{EngineError, ResultEngine};

mod access;
mod budgets;
mod ledger;
mod registry;

pub use ledger::LedgerFilter;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Per-family async locks.
///
/// Mutating operations serialize per family; distinct families proceed in
/// parallel. The registry grows one entry per family touched by this process.
#[derive(Debug, Default)]
struct FamilyLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FamilyLocks {
    fn get(&self, family_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|err| err.into_inner());
        Arc::clone(map.entry(family_id.to_string()).or_default())
    }
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    family_locks: FamilyLocks,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Acquire the write lock for one family.
    ///
    /// Held across the whole DB transaction of a mutating operation so
    /// concurrent writers to the same family never interleave.
    pub(crate) async fn lock_family(&self, family_id: &str) -> tokio::sync::OwnedMutexGuard<()> {
        self.family_locks.get(family_id).lock_owned().await
    }
}

fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            family_locks: FamilyLocks::default(),
        })
    }
}
