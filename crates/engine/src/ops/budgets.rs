use chrono::Utc;

use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*,
};

use crate::{
    BudgetLimit, BudgetScope, EngineError, FamilyStatistics, Period, ResultEngine, Utilization,
    budget_limits,
};

use super::{Engine, with_tx};

impl Engine {
    /// Sets the spending cap for one `(scope, period)` key (owner-only).
    ///
    /// Overwrites any existing limit for the same key: last writer wins, no
    /// merge.
    pub async fn set_limit(
        &self,
        family_id: &str,
        requester_id: &str,
        scope: BudgetScope,
        period: Period,
        amount_minor: i64,
    ) -> ResultEngine<()> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "limit amount_minor must be > 0".to_string(),
            ));
        }

        let _guard = self.lock_family(family_id).await;
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            self.require_owner(&db_tx, family_id, requester_id).await?;

            let limit = BudgetLimit {
                family_id: family_id.to_string(),
                scope,
                period,
                amount_minor,
                set_by: requester_id.to_string(),
                updated_at: now,
            };
            let active = budget_limits::ActiveModel::from(&limit);

            match self.find_limit(&db_tx, family_id, &limit.scope, &period).await? {
                Some(_) => {
                    active.update(&db_tx).await?;
                }
                None => {
                    active.insert(&db_tx).await?;
                }
            }

            Ok(())
        })
    }

    /// Removes the limit for one `(scope, period)` key (owner-only).
    pub async fn remove_limit(
        &self,
        family_id: &str,
        requester_id: &str,
        scope: BudgetScope,
        period: Period,
    ) -> ResultEngine<()> {
        let _guard = self.lock_family(family_id).await;
        with_tx!(self, |db_tx| {
            self.require_owner(&db_tx, family_id, requester_id).await?;

            let result = budget_limits::Entity::delete_by_id((
                family_id.to_string(),
                scope.storage_key().to_string(),
                period.start(),
                period.end(),
            ))
            .exec(&db_tx)
            .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::NotFound("budget limit not exists".to_string()));
            }
            Ok(())
        })
    }

    /// Lists every configured limit for a family (any active member).
    pub async fn list_limits(
        &self,
        family_id: &str,
        requester_id: &str,
    ) -> ResultEngine<Vec<BudgetLimit>> {
        with_tx!(self, |db_tx| {
            self.require_active_member(&db_tx, family_id, requester_id)
                .await?;

            let rows = budget_limits::Entity::find()
                .filter(budget_limits::Column::FamilyId.eq(family_id.to_string()))
                .order_by_asc(budget_limits::Column::PeriodStart)
                .order_by_asc(budget_limits::Column::Category)
                .all(&db_tx)
                .await?;
            rows.into_iter().map(BudgetLimit::try_from).collect()
        })
    }

    /// Computes spent/remaining figures for one `(scope, period)` key.
    ///
    /// Always recomputed from the ledger inside the read transaction: the
    /// figures cannot drift from the recorded entries. `remaining_minor` is
    /// negative on overspend, never clamped.
    pub async fn utilization(
        &self,
        family_id: &str,
        requester_id: &str,
        scope: BudgetScope,
        period: Period,
    ) -> ResultEngine<Utilization> {
        with_tx!(self, |db_tx| {
            self.require_active_member(&db_tx, family_id, requester_id)
                .await?;

            let expenses = self
                .sum_entries(
                    &db_tx,
                    family_id,
                    scope.category_filter(),
                    Some(&period),
                    " AND amount_minor < 0",
                )
                .await?;
            let income = self
                .sum_entries(
                    &db_tx,
                    family_id,
                    scope.category_filter(),
                    Some(&period),
                    " AND amount_minor > 0",
                )
                .await?;

            let spent_minor = -expenses;
            let limit_minor = self
                .find_limit(&db_tx, family_id, &scope, &period)
                .await?
                .map(|m| m.amount_minor);
            let remaining_minor = limit_minor.map(|limit| limit - spent_minor);
            let over_limit_by_minor = remaining_minor.map_or(0, |r| if r < 0 { -r } else { 0 });

            Ok(Utilization {
                scope,
                period,
                spent_minor,
                income_minor: income,
                limit_minor,
                remaining_minor,
                over_limit_by_minor,
            })
        })
    }

    /// Returns family-wide totals, optionally restricted to a period.
    ///
    /// Recomputed from the ledger like `utilization`.
    pub async fn family_statistics(
        &self,
        family_id: &str,
        requester_id: &str,
        period: Option<Period>,
    ) -> ResultEngine<FamilyStatistics> {
        with_tx!(self, |db_tx| {
            self.require_active_member(&db_tx, family_id, requester_id)
                .await?;
            let family = self.require_family(&db_tx, family_id).await?;
            let currency = crate::Currency::try_from(family.currency.as_str())?;

            let income_minor = self
                .sum_entries(&db_tx, family_id, None, period.as_ref(), " AND amount_minor > 0")
                .await?;
            let expenses_minor = -self
                .sum_entries(&db_tx, family_id, None, period.as_ref(), " AND amount_minor < 0")
                .await?;

            Ok(FamilyStatistics {
                currency,
                income_minor,
                expenses_minor,
                net_minor: income_minor - expenses_minor,
            })
        })
    }

    async fn find_limit(
        &self,
        db: &DatabaseTransaction,
        family_id: &str,
        scope: &BudgetScope,
        period: &Period,
    ) -> ResultEngine<Option<budget_limits::Model>> {
        budget_limits::Entity::find()
            .filter(budget_limits::Column::FamilyId.eq(family_id.to_string()))
            .filter(budget_limits::Column::Category.eq(scope.storage_key().to_string()))
            .filter(budget_limits::Column::PeriodStart.eq(period.start()))
            .filter(budget_limits::Column::PeriodEnd.eq(period.end()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Sums non-deleted amounts matching the given restrictions.
    async fn sum_entries(
        &self,
        db: &DatabaseTransaction,
        family_id: &str,
        category: Option<&str>,
        period: Option<&Period>,
        sign_cond: &str,
    ) -> ResultEngine<i64> {
        let mut sql = String::from(
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
             FROM transactions \
             WHERE family_id = ? AND deleted_at IS NULL",
        );
        let mut values: Vec<Value> = vec![family_id.into()];
        if let Some(period) = period {
            sql.push_str(" AND occurred_at >= ? AND occurred_at < ?");
            values.push(period.start().into());
            values.push(period.end().into());
        }
        if let Some(category) = category {
            sql.push_str(" AND category = ?");
            values.push(category.into());
        }
        sql.push_str(sign_cond);

        let stmt =
            Statement::from_sql_and_values(self.database.get_database_backend(), sql, values);
        let row = db.query_one(stmt).await?;
        Ok(row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0))
    }
}
