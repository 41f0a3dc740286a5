//! Budget limits and utilization.
//!
//! A `BudgetLimit` caps spending for one `(scope, period)` key: either a
//! single category or the whole family ("overall"). Category limits and the
//! overall limit are independent and deliberately not reconciled against each
//! other. Utilization is always recomputed from the ledger, never cached.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Period, ResultEngine};

/// Reserved category name that addresses the family-wide limit.
pub(crate) const OVERALL_INTERNAL_NAME: &str = "overall";

/// What a budget limit or utilization query applies to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetScope {
    /// Aggregates across all categories for the period.
    Overall,
    Category(String),
}

impl BudgetScope {
    /// Builds a category scope, rejecting empty and reserved names.
    pub fn category(name: &str) -> ResultEngine<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidAmount(
                "category name must not be empty".to_string(),
            ));
        }
        if trimmed.eq_ignore_ascii_case(OVERALL_INTERNAL_NAME) {
            return Err(EngineError::InvalidAmount(
                "category name is reserved".to_string(),
            ));
        }
        Ok(Self::Category(trimmed.to_string()))
    }

    /// Stored column value for this scope.
    #[must_use]
    pub(crate) fn storage_key(&self) -> &str {
        match self {
            Self::Overall => OVERALL_INTERNAL_NAME,
            Self::Category(name) => name.as_str(),
        }
    }

    /// Category to restrict ledger sums to; `None` means all categories.
    #[must_use]
    pub(crate) fn category_filter(&self) -> Option<&str> {
        match self {
            Self::Overall => None,
            Self::Category(name) => Some(name.as_str()),
        }
    }
}

impl core::fmt::Display for BudgetScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.storage_key())
    }
}

/// A cap on spending for a `(scope, period)` key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetLimit {
    pub family_id: String,
    pub scope: BudgetScope,
    pub period: Period,
    pub amount_minor: i64,
    pub set_by: String,
    pub updated_at: DateTime<Utc>,
}

/// Derived spent/remaining figures for a `(scope, period)` key.
///
/// `spent_minor` counts expenses only (the absolute value of the negative
/// amounts); income in the period is reported separately and never offsets
/// spending against the limit. `remaining_minor` may be negative: overspend
/// is reported, not clamped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utilization {
    pub scope: BudgetScope,
    pub period: Period,
    pub spent_minor: i64,
    pub income_minor: i64,
    pub limit_minor: Option<i64>,
    pub remaining_minor: Option<i64>,
    pub over_limit_by_minor: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "budget_limits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub family_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub category: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub period_start: DateTimeUtc,
    #[sea_orm(primary_key, auto_increment = false)]
    pub period_end: DateTimeUtc,
    pub amount_minor: i64,
    pub set_by: String,
    pub updated_at: DateTimeUtc,
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

impl From<&BudgetLimit> for ActiveModel {
    fn from(value: &BudgetLimit) -> Self {
        Self {
            family_id: ActiveValue::Set(value.family_id.clone()),
            category: ActiveValue::Set(value.scope.storage_key().to_string()),
            period_start: ActiveValue::Set(value.period.start()),
            period_end: ActiveValue::Set(value.period.end()),
            amount_minor: ActiveValue::Set(value.amount_minor),
            set_by: ActiveValue::Set(value.set_by.clone()),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for BudgetLimit {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let scope = if model.category == OVERALL_INTERNAL_NAME {
            BudgetScope::Overall
        } else {
            BudgetScope::Category(model.category)
        };
        Ok(Self {
            scope,
            period: Period::new(model.period_start, model.period_end)?,
            family_id: model.family_id,
            amount_minor: model.amount_minor,
            set_by: model.set_by,
            updated_at: model.updated_at,
        })
    }
}
