//! Activity log entity.
//!
//! Append-only audit trail of mutating actions. Entries expire after a
//! retention window; the server purges them periodically.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Closed set of auditable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    #[sea_orm(string_value = "LOGIN")]
    Login,
    #[sea_orm(string_value = "LOGOUT")]
    Logout,
    #[sea_orm(string_value = "LOGIN_FAILED")]
    LoginFailed,
    #[sea_orm(string_value = "QUESTION_CREATE")]
    QuestionCreate,
    #[sea_orm(string_value = "QUESTION_UPDATE")]
    QuestionUpdate,
    #[sea_orm(string_value = "QUESTION_DELETE")]
    QuestionDelete,
    #[sea_orm(string_value = "QUESTION_TRANSFER")]
    QuestionTransfer,
    #[sea_orm(string_value = "COMPANY_CREATE")]
    CompanyCreate,
    #[sea_orm(string_value = "COMPANY_UPDATE")]
    CompanyUpdate,
    #[sea_orm(string_value = "COMPANY_DELETE")]
    CompanyDelete,
    #[sea_orm(string_value = "TIP_CREATE")]
    TipCreate,
    #[sea_orm(string_value = "TIP_UPDATE")]
    TipUpdate,
    #[sea_orm(string_value = "TIP_DELETE")]
    TipDelete,
    #[sea_orm(string_value = "USER_ROLE_CHANGE")]
    UserRoleChange,
    #[sea_orm(string_value = "ADMIN_ADD_QUESTION")]
    AdminAddQuestion,
    #[sea_orm(string_value = "SYSTEM_ERROR")]
    SystemError,
}

/// What kind of record an action targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "question")]
    Question,
    #[sea_orm(string_value = "company")]
    Company,
    #[sea_orm(string_value = "tip")]
    Tip,
    #[sea_orm(string_value = "system")]
    System,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Acting user (None for anonymous/system actions)
    #[sea_orm(nullable, indexed)]
    pub user_id: Option<String>,

    /// Snapshot of the actor at action time (name, enrollment, role)
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub user_info: Option<Json>,

    #[sea_orm(indexed)]
    pub action: ActivityAction,

    #[sea_orm(nullable)]
    pub target_type: Option<TargetType>,

    #[sea_orm(nullable)]
    pub target_id: Option<String>,

    /// Snapshot of the target at action time
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub target_info: Option<Json>,

    #[sea_orm(nullable)]
    pub ip: Option<String>,

    #[sea_orm(nullable)]
    pub user_agent: Option<String>,

    #[sea_orm(nullable)]
    pub method: Option<String>,

    #[sea_orm(nullable)]
    pub path: Option<String>,

    pub is_error: bool,

    /// Debug detail for error entries
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub error_details: Option<Json>,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub metadata: Option<Json>,

    #[sea_orm(indexed)]
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
