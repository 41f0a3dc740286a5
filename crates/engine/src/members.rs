//! Family membership rows.
//!
//! A member is a user inside exactly one family, with a role gating writes
//! and a lifecycle state: `Invited -> Active -> (Left | Removed)`. Terminal
//! states are kept for audit; only a fresh owner invite resets them.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Member,
}

impl MemberRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Member => "member",
        }
    }

    #[must_use]
    pub fn is_owner(self) -> bool {
        matches!(self, Self::Owner)
    }
}

impl TryFrom<&str> for MemberRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "owner" => Ok(Self::Owner),
            "member" => Ok(Self::Member),
            other => Err(EngineError::NotFound(format!(
                "invalid member role: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberState {
    Invited,
    Active,
    Left,
    Removed,
}

impl MemberState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invited => "invited",
            Self::Active => "active",
            Self::Left => "left",
            Self::Removed => "removed",
        }
    }

    /// Invited and active rows count against the single-family policy.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Invited | Self::Active)
    }
}

impl TryFrom<&str> for MemberState {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "invited" => Ok(Self::Invited),
            "active" => Ok(Self::Active),
            "left" => Ok(Self::Left),
            "removed" => Ok(Self::Removed),
            other => Err(EngineError::NotFound(format!(
                "invalid member state: {other}"
            ))),
        }
    }
}

/// A user's membership in a family.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub family_id: String,
    pub user_id: String,
    pub role: MemberRole,
    pub state: MemberState,
    pub invited_by: Option<String>,
    pub invited_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub family_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub role: String,
    pub state: String,
    pub invited_by: Option<String>,
    pub invited_at: DateTimeUtc,
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

impl From<&Member> for ActiveModel {
    fn from(value: &Member) -> Self {
        Self {
            family_id: ActiveValue::Set(value.family_id.clone()),
            user_id: ActiveValue::Set(value.user_id.clone()),
            role: ActiveValue::Set(value.role.as_str().to_string()),
            state: ActiveValue::Set(value.state.as_str().to_string()),
            invited_by: ActiveValue::Set(value.invited_by.clone()),
            invited_at: ActiveValue::Set(value.invited_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Member {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            role: MemberRole::try_from(model.role.as_str())?,
            state: MemberState::try_from(model.state.as_str())?,
            family_id: model.family_id,
            user_id: model.user_id,
            invited_by: model.invited_by,
            invited_at: model.invited_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        assert_eq!(
            MemberRole::try_from(MemberRole::Owner.as_str()).unwrap(),
            MemberRole::Owner
        );
        assert!(MemberRole::try_from("admin").is_err());
    }

    #[test]
    fn live_states() {
        assert!(MemberState::Invited.is_live());
        assert!(MemberState::Active.is_live());
        assert!(!MemberState::Left.is_live());
        assert!(!MemberState::Removed.is_live());
    }
}
