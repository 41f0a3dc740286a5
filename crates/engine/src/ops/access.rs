use sea_orm::{Condition, DatabaseTransaction, QueryFilter, prelude::*};

use crate::{
    EngineError, MemberRole, MemberState, ResultEngine, families, members,
};

use super::Engine;

impl Engine {
    pub(super) async fn find_family(
        &self,
        db: &DatabaseTransaction,
        family_id: &str,
    ) -> ResultEngine<Option<families::Model>> {
        families::Entity::find_by_id(family_id.to_string())
            .one(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn require_family(
        &self,
        db: &DatabaseTransaction,
        family_id: &str,
    ) -> ResultEngine<families::Model> {
        self.find_family(db, family_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("family not exists".to_string()))
    }

    pub(super) async fn member_row(
        &self,
        db: &DatabaseTransaction,
        family_id: &str,
        user_id: &str,
    ) -> ResultEngine<Option<members::Model>> {
        members::Entity::find_by_id((family_id.to_string(), user_id.to_string()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Requires an `active` membership and returns its row.
    pub(super) async fn require_active_member(
        &self,
        db: &DatabaseTransaction,
        family_id: &str,
        user_id: &str,
    ) -> ResultEngine<members::Model> {
        self.require_family(db, family_id).await?;
        let row = self
            .member_row(db, family_id, user_id)
            .await?
            .filter(|m| m.state == MemberState::Active.as_str())
            .ok_or_else(|| {
                EngineError::NotAMember(format!("{user_id} is not a member of this family"))
            })?;
        Ok(row)
    }

    /// Requires an active membership with the `owner` role.
    pub(super) async fn require_owner(
        &self,
        db: &DatabaseTransaction,
        family_id: &str,
        user_id: &str,
    ) -> ResultEngine<members::Model> {
        let row = self.require_active_member(db, family_id, user_id).await?;
        if row.role != MemberRole::Owner.as_str() {
            return Err(EngineError::NotAuthorized(format!(
                "{user_id} is not an owner of this family"
            )));
        }
        Ok(row)
    }

    /// Single-family policy probe: the invited/active membership of a user in
    /// any family, if one exists.
    pub(super) async fn live_membership_of(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Option<members::Model>> {
        members::Entity::find()
            .filter(members::Column::UserId.eq(user_id.to_string()))
            .filter(
                Condition::any()
                    .add(members::Column::State.eq(MemberState::Invited.as_str()))
                    .add(members::Column::State.eq(MemberState::Active.as_str())),
            )
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Active members of a family other than `user_id`.
    pub(super) async fn other_active_members(
        &self,
        db: &DatabaseTransaction,
        family_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<members::Model>> {
        members::Entity::find()
            .filter(members::Column::FamilyId.eq(family_id.to_string()))
            .filter(members::Column::State.eq(MemberState::Active.as_str()))
            .filter(members::Column::UserId.ne(user_id.to_string()))
            .all(db)
            .await
            .map_err(Into::into)
    }
}
