//! The `Family` is the budgeting group sharing one ledger. Members,
//! transactions, and budget limits all hang off a family and are destroyed
//! with it.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError};

/// The budgeting group sharing one ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub id: String,
    pub name: String,
    pub currency: Currency,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Family {
    pub fn new(name: String, created_by: &str, currency: Currency, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            currency,
            created_by: created_by.to_string(),
            created_at: now,
        }
    }
}

/// Income/expense totals for a family, recomputed from the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyStatistics {
    pub currency: Currency,
    pub income_minor: i64,
    pub expenses_minor: i64,
    pub net_minor: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "families")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub currency: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::members::Entity")]
    Members,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::budget_limits::Entity")]
    BudgetLimits,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::budget_limits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetLimits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Family> for ActiveModel {
    fn from(value: &Family) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            created_by: ActiveValue::Set(value.created_by.clone()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Family {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            currency: Currency::try_from(model.currency.as_str())?,
            id: model.id,
            name: model.name,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}
