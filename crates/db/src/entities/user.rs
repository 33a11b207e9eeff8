//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User privilege levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "superadmin")]
    SuperAdmin,
}

impl Role {
    /// Whether this role carries moderation privileges.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Institutional enrollment number, the stable external handle
    #[sea_orm(unique)]
    pub enrollment_number: String,

    /// Display name, refreshed on every login
    pub full_name: String,

    /// Avatar URL
    #[sea_orm(nullable)]
    pub display_picture: Option<String>,

    /// Canonical organizational unit
    pub branch: String,

    /// Institute contact address
    pub email: String,

    /// Privilege level
    pub role: Role,

    /// Access token for bearer authentication
    #[sea_orm(unique, nullable)]
    pub token: Option<String>,

    /// Question IDs this user has visited (weak references)
    #[sea_orm(column_type = "JsonBinary")]
    pub visited_question_ids: Json,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::question::Entity")]
    Questions,

    #[sea_orm(has_many = "super::claim::Entity")]
    Claims,
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Questions.def()
    }
}

impl Related<super::claim::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Claims.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
