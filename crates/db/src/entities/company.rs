//! Company entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Undergraduate programmes a role may hire from.
pub const UG_BRANCHES: &[&str] = &[
    "B.Arch.",
    "B.Tech. (Chemical Engineering)",
    "B.Tech. (Civil Engineering)",
    "B.Tech. (Computer Science and Engineering)",
    "B.Tech. (Electrical Engineering)",
    "B.Tech. (Electronics & Communication Engineering)",
    "B.Tech. (Mechanical Engineering)",
    "B.Tech. (Metallurgical & Materials Engineering)",
    "B.Tech. (Production and Industrial Engineering)",
    "B.Tech. (Engineering Physics)",
    "B.Tech. Biosciences and Bioengineering",
    "B.Tech. (Data Science and Artificial Intelligence)",
    "BS-MS (Chemical Sciences)",
    "BS-MS (Economics)",
    "BS-MS (Mathematics and Computing)",
    "BS-MS (Physics)",
    "Integrated M.Tech. Geological Technology",
    "Integrated M.Tech. Geophysical Technology",
];

/// Postgraduate programmes a role may hire from.
pub const PG_BRANCHES: &[&str] = &[
    "M.Tech. (Computer Science)",
    "M.Tech. (Electrical Engineering)",
    "M.Tech. (Mechanical Engineering)",
    "M.Tech. (Civil Engineering)",
    "M.Tech. (Chemical Engineering)",
    "M.Tech. (Electronics & Communication)",
    "MBA",
    "M.Sc. (Mathematics)",
    "M.Sc. (Physics)",
    "M.Sc. (Chemistry)",
    "M.Arch.",
    "MCA",
];

/// Doctoral programmes a role may hire from.
pub const PHD_BRANCHES: &[&str] = &[
    "Ph.D. (Computer Science)",
    "Ph.D. (Electrical Engineering)",
    "Ph.D. (Mechanical Engineering)",
    "Ph.D. (Civil Engineering)",
    "Ph.D. (Chemical Engineering)",
    "Ph.D. (Mathematics)",
    "Ph.D. (Physics)",
    "Ph.D. (Chemistry)",
    "Ph.D. (Management)",
];

/// One line of a role's compensation breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StipendBreakdown {
    pub label: String,
    pub amount: i64,
    /// "monthly" or "one-time"
    #[serde(default = "default_stipend_kind")]
    pub kind: String,
}

fn default_stipend_kind() -> String {
    "monthly".to_string()
}

/// Branches a role hires from, per degree level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiringBranches {
    #[serde(default)]
    pub ug: Vec<String>,
    #[serde(default)]
    pub pg: Vec<String>,
    #[serde(default)]
    pub phd: Vec<String>,
}

/// A role posting embedded in a company (value semantics, no identity of
/// its own).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePosting {
    pub role_name: String,
    /// Hiring day slot, e.g. "Day 0", "Day 1", "Later"
    #[serde(default)]
    pub day: Option<String>,
    /// Duration in months
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub location: Option<String>,
    /// Monthly stipend total in INR
    #[serde(default)]
    pub total_stipend: Option<i64>,
    /// One-time payments total (bonus, grants)
    #[serde(default)]
    pub total_one_time: Option<i64>,
    #[serde(default)]
    pub stipend_breakdown: Vec<StipendBreakdown>,
    /// Eligibility criteria text
    #[serde(default)]
    pub criteria: Option<String>,
    /// Perks & support details
    #[serde(default)]
    pub perks: Option<String>,
    #[serde(default)]
    pub hiring_for: HiringBranches,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "company")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Display name
    pub name: String,

    /// Lowercased name, unique (case-insensitive uniqueness)
    #[sea_orm(unique)]
    pub name_lower: String,

    /// Logo URL
    #[sea_orm(nullable)]
    pub logo: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Role postings (embedded value objects)
    #[sea_orm(column_type = "JsonBinary")]
    pub roles: Json,

    /// User who created this company
    pub added_by: String,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::question::Entity")]
    Questions,

    #[sea_orm(has_many = "super::company_tip::Entity")]
    Tips,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AddedBy",
        to = "super::user::Column::Id"
    )]
    AddedByUser,
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Questions.def()
    }
}

impl Related<super::company_tip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tips.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
