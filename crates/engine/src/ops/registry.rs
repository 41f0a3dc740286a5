use chrono::Utc;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*};

use crate::{
    Currency, EngineError, Family, Member, MemberRole, MemberState, ResultEngine, families,
    members,
};

use super::{Engine, normalize_required_name, with_tx};

impl Engine {
    /// Creates a family with `owner_id` as its first active owner.
    ///
    /// A user can belong to one family at a time; creating a second one
    /// requires leaving the first.
    pub async fn create_family(
        &self,
        name: &str,
        owner_id: &str,
        currency: Option<Currency>,
    ) -> ResultEngine<String> {
        let name = normalize_required_name(name, "family")?;
        let now = Utc::now();

        let family = Family::new(name, owner_id, currency.unwrap_or_default(), now);
        let family_id = family.id.clone();
        let family_entry: families::ActiveModel = (&family).into();

        with_tx!(self, |db_tx| {
            if let Some(existing) = self.live_membership_of(&db_tx, owner_id).await? {
                return Err(EngineError::AlreadyMember(format!(
                    "{owner_id} already belongs to family {}",
                    existing.family_id
                )));
            }

            family_entry.insert(&db_tx).await?;

            let owner = Member {
                family_id: family_id.clone(),
                user_id: owner_id.to_string(),
                role: MemberRole::Owner,
                state: MemberState::Active,
                invited_by: None,
                invited_at: now,
                updated_at: now,
            };
            members::ActiveModel::from(&owner).insert(&db_tx).await?;

            Ok(family_id)
        })
    }

    /// Invites a user into the family (owner-only).
    ///
    /// A terminal (`left`/`removed`) row is reset to `invited`; re-entry
    /// always takes a fresh invite.
    pub async fn invite(
        &self,
        family_id: &str,
        requester_id: &str,
        invitee_id: &str,
    ) -> ResultEngine<()> {
        let _guard = self.lock_family(family_id).await;
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            self.require_owner(&db_tx, family_id, requester_id).await?;

            if let Some(existing) = self.live_membership_of(&db_tx, invitee_id).await? {
                return Err(EngineError::AlreadyMember(format!(
                    "{invitee_id} already belongs to family {}",
                    existing.family_id
                )));
            }

            match self.member_row(&db_tx, family_id, invitee_id).await? {
                Some(_terminal) => {
                    let active = members::ActiveModel {
                        family_id: ActiveValue::Set(family_id.to_string()),
                        user_id: ActiveValue::Set(invitee_id.to_string()),
                        role: ActiveValue::Set(MemberRole::Member.as_str().to_string()),
                        state: ActiveValue::Set(MemberState::Invited.as_str().to_string()),
                        invited_by: ActiveValue::Set(Some(requester_id.to_string())),
                        invited_at: ActiveValue::Set(now),
                        updated_at: ActiveValue::Set(now),
                    };
                    active.update(&db_tx).await?;
                }
                None => {
                    let invited = Member {
                        family_id: family_id.to_string(),
                        user_id: invitee_id.to_string(),
                        role: MemberRole::Member,
                        state: MemberState::Invited,
                        invited_by: Some(requester_id.to_string()),
                        invited_at: now,
                        updated_at: now,
                    };
                    members::ActiveModel::from(&invited).insert(&db_tx).await?;
                }
            }

            Ok(())
        })
    }

    /// Accepts a pending invite, flipping the member to `active`.
    pub async fn join(&self, family_id: &str, user_id: &str) -> ResultEngine<()> {
        let _guard = self.lock_family(family_id).await;
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            self.require_family(&db_tx, family_id).await?;

            let row = self.member_row(&db_tx, family_id, user_id).await?;
            match row.as_ref().map(|m| m.state.as_str()) {
                Some("active") => {
                    return Err(EngineError::AlreadyMember(format!(
                        "{user_id} is already an active member"
                    )));
                }
                Some("invited") => {}
                _ => {
                    // Live membership in another family is AlreadyMember;
                    // anything else means no pending invite here.
                    if let Some(other) = self.live_membership_of(&db_tx, user_id).await? {
                        return Err(EngineError::AlreadyMember(format!(
                            "{user_id} already belongs to family {}",
                            other.family_id
                        )));
                    }
                    return Err(EngineError::NotFound("no pending invite".to_string()));
                }
            }

            let active = members::ActiveModel {
                family_id: ActiveValue::Set(family_id.to_string()),
                user_id: ActiveValue::Set(user_id.to_string()),
                state: ActiveValue::Set(MemberState::Active.as_str().to_string()),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Leaves the family.
    ///
    /// The last owner cannot leave while other active members remain:
    /// promote someone first.
    pub async fn leave(&self, family_id: &str, user_id: &str) -> ResultEngine<()> {
        let _guard = self.lock_family(family_id).await;
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let row = self.require_active_member(&db_tx, family_id, user_id).await?;

            if row.role == MemberRole::Owner.as_str() {
                let others = self.other_active_members(&db_tx, family_id, user_id).await?;
                let another_owner = others
                    .iter()
                    .any(|m| m.role == MemberRole::Owner.as_str());
                if !others.is_empty() && !another_owner {
                    return Err(EngineError::OwnerRequired(
                        "promote another member before leaving".to_string(),
                    ));
                }
            }

            let left = members::ActiveModel {
                family_id: ActiveValue::Set(family_id.to_string()),
                user_id: ActiveValue::Set(user_id.to_string()),
                state: ActiveValue::Set(MemberState::Left.as_str().to_string()),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            left.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Removes an invited or active member (owner-only). Owners cannot be
    /// removed; demote paths go through `leave`.
    pub async fn remove_member(
        &self,
        family_id: &str,
        requester_id: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        let _guard = self.lock_family(family_id).await;
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            self.require_owner(&db_tx, family_id, requester_id).await?;

            let row = self
                .member_row(&db_tx, family_id, user_id)
                .await?
                .filter(|m| {
                    m.state == MemberState::Active.as_str()
                        || m.state == MemberState::Invited.as_str()
                })
                .ok_or_else(|| EngineError::NotFound("member not exists".to_string()))?;
            if row.role == MemberRole::Owner.as_str() {
                return Err(EngineError::NotAuthorized(
                    "cannot remove an owner".to_string(),
                ));
            }

            let removed = members::ActiveModel {
                family_id: ActiveValue::Set(family_id.to_string()),
                user_id: ActiveValue::Set(user_id.to_string()),
                state: ActiveValue::Set(MemberState::Removed.as_str().to_string()),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            removed.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Grants the `owner` role to an active member (owner-only).
    pub async fn promote(
        &self,
        family_id: &str,
        requester_id: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        let _guard = self.lock_family(family_id).await;
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            self.require_owner(&db_tx, family_id, requester_id).await?;

            self.member_row(&db_tx, family_id, user_id)
                .await?
                .filter(|m| m.state == MemberState::Active.as_str())
                .ok_or_else(|| EngineError::NotFound("member not exists".to_string()))?;

            let promoted = members::ActiveModel {
                family_id: ActiveValue::Set(family_id.to_string()),
                user_id: ActiveValue::Set(user_id.to_string()),
                role: ActiveValue::Set(MemberRole::Owner.as_str().to_string()),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            promoted.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Lists the family roster, invited and former members included.
    pub async fn list_members(
        &self,
        family_id: &str,
        requester_id: &str,
    ) -> ResultEngine<Vec<Member>> {
        with_tx!(self, |db_tx| {
            self.require_active_member(&db_tx, family_id, requester_id)
                .await?;

            let rows = members::Entity::find()
                .filter(members::Column::FamilyId.eq(family_id.to_string()))
                .order_by_asc(members::Column::InvitedAt)
                .order_by_asc(members::Column::UserId)
                .all(&db_tx)
                .await?;

            rows.into_iter().map(Member::try_from).collect()
        })
    }

    /// Resolves the invited/active membership of a user, if any.
    ///
    /// The gateway uses this to answer "which family am I in?" without
    /// knowing a family id up front.
    pub async fn membership_of(&self, user_id: &str) -> ResultEngine<Option<Member>> {
        with_tx!(self, |db_tx| {
            self.live_membership_of(&db_tx, user_id)
                .await?
                .map(Member::try_from)
                .transpose()
        })
    }

    /// Returns a family snapshot (any active member).
    pub async fn family(&self, family_id: &str, requester_id: &str) -> ResultEngine<Family> {
        with_tx!(self, |db_tx| {
            self.require_active_member(&db_tx, family_id, requester_id)
                .await?;
            let model = self.require_family(&db_tx, family_id).await?;
            Family::try_from(model)
        })
    }

    /// Deletes a family and everything it owns (owner-only).
    pub async fn delete_family(&self, family_id: &str, requester_id: &str) -> ResultEngine<()> {
        let _guard = self.lock_family(family_id).await;
        with_tx!(self, |db_tx| {
            self.require_owner(&db_tx, family_id, requester_id).await?;

            // Explicit cascade within one DB transaction; not every backend
            // enforces the FK cascade declarations.
            let backend = self.database.get_database_backend();
            for sql in [
                "DELETE FROM budget_limits WHERE family_id = ?;",
                "DELETE FROM transactions WHERE family_id = ?;",
                "DELETE FROM members WHERE family_id = ?;",
                "DELETE FROM families WHERE id = ?;",
            ] {
                db_tx
                    .execute(Statement::from_sql_and_values(
                        backend,
                        sql,
                        vec![family_id.into()],
                    ))
                    .await?;
            }

            Ok(())
        })
    }
}
