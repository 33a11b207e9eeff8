//! Question entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of assessment a question came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    #[sea_orm(string_value = "interview")]
    Interview,
    #[sea_orm(string_value = "oa")]
    Oa,
    #[sea_orm(string_value = "others")]
    Others,
}

/// One entry in a question's ownership trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipTransfer {
    /// Owner before the transfer (None for anonymous submissions)
    pub previous_owner: Option<String>,
    /// Owner after the transfer
    pub transferred_to: String,
    /// Admin who performed the transfer
    pub transferred_by: String,
    pub date: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "question")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning user (None = anonymous submission)
    #[sea_orm(nullable, indexed)]
    pub submitted_by: Option<String>,

    #[sea_orm(indexed)]
    pub company_id: String,

    /// Per-company dense sequence number, assigned at creation
    pub question_number: i32,

    pub question_type: QuestionType,

    /// Free-text label, required when `question_type` is `Others`
    #[sea_orm(nullable)]
    pub other_type: Option<String>,

    /// Month the interview/assessment happened (1-12)
    pub month: i32,

    pub year: i32,

    /// Sanitized rich-text question body
    #[sea_orm(column_type = "Text")]
    pub body: String,

    /// Sanitized rich-text approach/suggestions
    #[sea_orm(column_type = "Text", nullable)]
    pub suggestions: Option<String>,

    /// Trail of past owners (list of transfer records)
    #[sea_orm(column_type = "JsonBinary")]
    pub ownership_history: Json,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SubmittedBy",
        to = "super::user::Column::Id"
    )]
    Owner,

    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id"
    )]
    Company,

    #[sea_orm(has_many = "super::claim::Entity")]
    Claims,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::claim::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Claims.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
