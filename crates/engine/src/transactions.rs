//! Ledger entries.
//!
//! A `Transaction` is one immutable signed monetary fact in a family's
//! ledger. Amounts are stored as signed integer **minor units** (cents for
//! EUR): positive = income, negative = expense, never zero.
//!
//! The ledger is append-only. `seq` is a per-family insertion counter and
//! `(occurred_at, seq)` never decreases in insertion order, so listings have
//! a stable total order. Edits and deletes never rewrite history: a delete
//! marks `deleted_at`/`deleted_by`, an amend appends a replacement row whose
//! `replaces_transaction_id` links back to the original.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// One immutable signed monetary entry in a family ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub family_id: String,
    pub created_by: String,
    pub amount_minor: i64,
    pub category: String,
    pub occurred_at: DateTime<Utc>,
    pub seq: i64,
    pub note: Option<String>,
    pub idempotency_key: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub replaces_transaction_id: Option<Uuid>,
}

impl Transaction {
    pub fn new(
        family_id: String,
        created_by: String,
        amount_minor: i64,
        category: String,
        occurred_at: DateTime<Utc>,
        seq: i64,
        note: Option<String>,
        idempotency_key: Option<String>,
    ) -> ResultEngine<Self> {
        if amount_minor == 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must not be zero".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            family_id,
            created_by,
            amount_minor,
            category,
            occurred_at,
            seq,
            note,
            idempotency_key,
            deleted_at: None,
            deleted_by: None,
            replaces_transaction_id: None,
        })
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns `true` for expense entries (negative amounts).
    #[must_use]
    pub fn is_expense(&self) -> bool {
        self.amount_minor < 0
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub family_id: String,
    pub created_by: String,
    pub amount_minor: i64,
    pub category: String,
    pub occurred_at: DateTimeUtc,
    pub seq: i64,
    pub note: Option<String>,
    pub idempotency_key: Option<String>,
    pub deleted_at: Option<DateTimeUtc>,
    pub deleted_by: Option<String>,
    pub replaces_transaction_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::families::Entity",
        from = "Column::FamilyId",
        to = "super::families::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Families,
}

impl Related<super::families::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Families.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            family_id: ActiveValue::Set(tx.family_id.clone()),
            created_by: ActiveValue::Set(tx.created_by.clone()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            category: ActiveValue::Set(tx.category.clone()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            seq: ActiveValue::Set(tx.seq),
            note: ActiveValue::Set(tx.note.clone()),
            idempotency_key: ActiveValue::Set(tx.idempotency_key.clone()),
            deleted_at: ActiveValue::Set(tx.deleted_at),
            deleted_by: ActiveValue::Set(tx.deleted_by.clone()),
            replaces_transaction_id: ActiveValue::Set(
                tx.replaces_transaction_id.map(|id| id.to_string()),
            ),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("transaction not exists".to_string()))?,
            family_id: model.family_id,
            created_by: model.created_by,
            amount_minor: model.amount_minor,
            category: model.category,
            occurred_at: model.occurred_at,
            seq: model.seq,
            note: model.note,
            idempotency_key: model.idempotency_key,
            deleted_at: model.deleted_at,
            deleted_by: model.deleted_by,
            replaces_transaction_id: model
                .replaces_transaction_id
                .and_then(|s| Uuid::parse_str(&s).ok()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "InvalidAmount")]
    fn rejects_zero_amount() {
        Transaction::new(
            "family".to_string(),
            "alice".to_string(),
            0,
            "groceries".to_string(),
            Utc::now(),
            1,
            None,
            None,
        )
        .unwrap();
    }

    #[test]
    fn expense_sign() {
        let tx = Transaction::new(
            "family".to_string(),
            "alice".to_string(),
            -2500,
            "groceries".to_string(),
            Utc::now(),
            1,
            None,
            None,
        )
        .unwrap();
        assert!(tx.is_expense());
        assert!(!tx.is_deleted());
    }
}
