use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};

use crate::{
    AmendCmd, AppendCmd, EngineError, MemberRole, ResultEngine, Transaction,
    budget_limits::OVERALL_INTERNAL_NAME, members, transactions,
};

use super::{Engine, normalize_optional_text, normalize_required_name, with_tx};

/// Filters for listing ledger entries.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct LedgerFilter {
    pub category: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If true, includes soft-deleted entries (default: false).
    pub include_deleted: bool,
}

fn validate_list_filter(filter: &LedgerFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidPeriod(
            "invalid range: from must be < to".to_string(),
        ));
    }
    Ok(())
}

fn normalize_category(value: &str) -> ResultEngine<String> {
    let category = normalize_required_name(value, "category")?;
    if category.eq_ignore_ascii_case(OVERALL_INTERNAL_NAME) {
        return Err(EngineError::InvalidAmount(
            "category name is reserved".to_string(),
        ));
    }
    Ok(category)
}

trait ApplyLedgerFilters: QueryFilter + Sized {
    fn apply_ledger_filters(self, filter: &LedgerFilter) -> Self;
}

impl<T> ApplyLedgerFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_ledger_filters(mut self, filter: &LedgerFilter) -> Self {
        if let Some(category) = &filter.category {
            self = self.filter(transactions::Column::Category.eq(category.clone()));
        }
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::OccurredAt.lt(to));
        }
        if !filter.include_deleted {
            self = self.filter(transactions::Column::DeletedAt.is_null());
        }
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct LedgerCursor {
    occurred_at: DateTime<Utc>,
    seq: i64,
}

impl LedgerCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid ledger cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid ledger cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid ledger cursor".to_string()))
    }
}

impl Engine {
    /// Appends a signed entry to the family ledger.
    ///
    /// Retries are safe when the command carries an idempotency key: a key
    /// already recorded for `(family, author)` returns the original entry id
    /// instead of inserting twice.
    pub async fn append(&self, cmd: AppendCmd) -> ResultEngine<Uuid> {
        if cmd.amount_minor == 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must not be zero".to_string(),
            ));
        }
        let category = normalize_category(&cmd.category)?;
        let note = normalize_optional_text(cmd.meta.note.as_deref());

        let _guard = self.lock_family(&cmd.family_id).await;
        with_tx!(self, |db_tx| {
            self.require_active_member(&db_tx, &cmd.family_id, &cmd.author_id)
                .await?;

            if let Some(key) = &cmd.meta.idempotency_key
                && let Some(existing) = self
                    .find_by_idempotency_key(&db_tx, &cmd.family_id, &cmd.author_id, key)
                    .await?
            {
                return Uuid::parse_str(&existing.id)
                    .map_err(|_| EngineError::NotFound("transaction not exists".to_string()));
            }

            let (seq, occurred_at) = self
                .next_ledger_position(&db_tx, &cmd.family_id, cmd.meta.occurred_at)
                .await?;

            let tx = Transaction::new(
                cmd.family_id.clone(),
                cmd.author_id.clone(),
                cmd.amount_minor,
                category,
                occurred_at,
                seq,
                note,
                cmd.meta.idempotency_key.clone(),
            )?;
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            Ok(tx.id)
        })
    }

    /// Soft-deletes a ledger entry.
    ///
    /// Only the author or an owner may delete. The row is marked, excluded
    /// from sums, and stays visible to `list` with `include_deleted`.
    pub async fn soft_delete(
        &self,
        family_id: &str,
        transaction_id: Uuid,
        requester_id: &str,
        deleted_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let _guard = self.lock_family(family_id).await;
        with_tx!(self, |db_tx| {
            let requester = self
                .require_active_member(&db_tx, family_id, requester_id)
                .await?;
            let model = self
                .require_live_transaction(&db_tx, family_id, transaction_id)
                .await?;
            self.authorize_entry_change(&requester, &model, requester_id)?;

            let tx_active = transactions::ActiveModel {
                id: ActiveValue::Set(transaction_id.to_string()),
                deleted_at: ActiveValue::Set(Some(deleted_at)),
                deleted_by: ActiveValue::Set(Some(requester_id.to_string())),
                ..Default::default()
            };
            tx_active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Replaces a ledger entry with a corrected version.
    ///
    /// The original is soft-deleted and the replacement is appended with an
    /// audit link back to it; history is never rewritten in place.
    pub async fn amend(&self, cmd: AmendCmd) -> ResultEngine<Uuid> {
        if cmd.amount_minor == 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must not be zero".to_string(),
            ));
        }
        let category = normalize_category(&cmd.category)?;
        let note = normalize_optional_text(cmd.meta.note.as_deref());
        let now = Utc::now();

        let _guard = self.lock_family(&cmd.family_id).await;
        with_tx!(self, |db_tx| {
            let requester = self
                .require_active_member(&db_tx, &cmd.family_id, &cmd.requester_id)
                .await?;
            let original = self
                .require_live_transaction(&db_tx, &cmd.family_id, cmd.transaction_id)
                .await?;
            self.authorize_entry_change(&requester, &original, &cmd.requester_id)?;

            let deleted = transactions::ActiveModel {
                id: ActiveValue::Set(original.id.clone()),
                deleted_at: ActiveValue::Set(Some(now)),
                deleted_by: ActiveValue::Set(Some(cmd.requester_id.clone())),
                ..Default::default()
            };
            deleted.update(&db_tx).await?;

            let (seq, occurred_at) = self
                .next_ledger_position(&db_tx, &cmd.family_id, cmd.meta.occurred_at)
                .await?;
            let mut replacement = Transaction::new(
                cmd.family_id.clone(),
                cmd.requester_id.clone(),
                cmd.amount_minor,
                category,
                occurred_at,
                seq,
                note,
                cmd.meta.idempotency_key.clone(),
            )?;
            replacement.replaces_transaction_id = Some(cmd.transaction_id);
            transactions::ActiveModel::from(&replacement)
                .insert(&db_tx)
                .await?;
            Ok(replacement.id)
        })
    }

    /// Lists ledger entries for a family (any active member).
    ///
    /// Ordered oldest → newest by `(occurred_at, seq)`.
    pub async fn list_transactions(
        &self,
        family_id: &str,
        requester_id: &str,
        limit: u64,
        filter: &LedgerFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let (items, _next) = self
            .list_transactions_page(family_id, requester_id, limit, None, filter)
            .await?;
        Ok(items)
    }

    /// Lists ledger entries with cursor-based pagination.
    ///
    /// The cursor restarts the scan after `(occurred_at, seq)` of the last
    /// returned entry, so a caller can resume a listing at any time.
    pub async fn list_transactions_page(
        &self,
        family_id: &str,
        requester_id: &str,
        limit: u64,
        cursor: Option<&str>,
        filter: &LedgerFilter,
    ) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
        with_tx!(self, |db_tx| {
            self.require_active_member(&db_tx, family_id, requester_id)
                .await?;
            validate_list_filter(filter)?;

            let limit_plus_one = limit.saturating_add(1);
            let mut query = transactions::Entity::find()
                .filter(transactions::Column::FamilyId.eq(family_id.to_string()))
                .order_by_asc(transactions::Column::OccurredAt)
                .order_by_asc(transactions::Column::Seq)
                .limit(limit_plus_one);

            if let Some(cursor) = cursor {
                let cursor = LedgerCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(transactions::Column::OccurredAt.gt(cursor.occurred_at))
                        .add(
                            Condition::all()
                                .add(transactions::Column::OccurredAt.eq(cursor.occurred_at))
                                .add(transactions::Column::Seq.gt(cursor.seq)),
                        ),
                );
            }
            query = query.apply_ledger_filters(filter);

            let rows: Vec<transactions::Model> = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut out: Vec<Transaction> = Vec::with_capacity(rows.len().min(limit as usize));
            for model in rows.into_iter().take(limit as usize) {
                out.push(Transaction::try_from(model)?);
            }

            let next_cursor = out.last().map(|tx| LedgerCursor {
                occurred_at: tx.occurred_at,
                seq: tx.seq,
            });
            let next_cursor = if has_more {
                next_cursor.map(|c| c.encode()).transpose()?
            } else {
                None
            };

            Ok((out, next_cursor))
        })
    }

    async fn find_by_idempotency_key(
        &self,
        db: &DatabaseTransaction,
        family_id: &str,
        author_id: &str,
        key: &str,
    ) -> ResultEngine<Option<transactions::Model>> {
        transactions::Entity::find()
            .filter(transactions::Column::FamilyId.eq(family_id.to_string()))
            .filter(transactions::Column::CreatedBy.eq(author_id.to_string()))
            .filter(transactions::Column::IdempotencyKey.eq(key.to_string()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Next `(seq, occurred_at)` for an insert.
    ///
    /// `seq` continues the per-family counter; `occurred_at` is clamped up to
    /// the family's current maximum so `(occurred_at, seq)` never decreases
    /// in insertion order.
    async fn next_ledger_position(
        &self,
        db: &DatabaseTransaction,
        family_id: &str,
        requested_at: DateTime<Utc>,
    ) -> ResultEngine<(i64, DateTime<Utc>)> {
        let last = transactions::Entity::find()
            .filter(transactions::Column::FamilyId.eq(family_id.to_string()))
            .order_by_desc(transactions::Column::Seq)
            .one(db)
            .await?;

        match last {
            Some(row) => Ok((row.seq + 1, requested_at.max(row.occurred_at))),
            None => Ok((1, requested_at)),
        }
    }

    async fn require_live_transaction(
        &self,
        db: &DatabaseTransaction,
        family_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<transactions::Model> {
        let model = transactions::Entity::find_by_id(transaction_id.to_string())
            .one(db)
            .await?
            .filter(|m| m.family_id == family_id)
            .ok_or_else(|| EngineError::NotFound("transaction not exists".to_string()))?;
        if model.deleted_at.is_some() {
            return Err(EngineError::NotFound(
                "transaction already deleted".to_string(),
            ));
        }
        Ok(model)
    }

    fn authorize_entry_change(
        &self,
        requester: &members::Model,
        entry: &transactions::Model,
        requester_id: &str,
    ) -> ResultEngine<()> {
        let is_author = entry.created_by == requester_id;
        let is_owner = requester.role == MemberRole::Owner.as_str();
        if !is_author && !is_owner {
            return Err(EngineError::NotAuthorized(
                "only the author or an owner may change an entry".to_string(),
            ));
        }
        Ok(())
    }
}
