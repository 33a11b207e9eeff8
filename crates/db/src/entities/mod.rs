//! Database entities.

pub mod activity_log;
pub mod claim;
pub mod company;
pub mod company_tip;
pub mod question;
pub mod user;

pub use activity_log::Entity as ActivityLog;
pub use claim::Entity as Claim;
pub use company::Entity as Company;
pub use company_tip::Entity as CompanyTip;
pub use question::Entity as Question;
pub use user::Entity as User;
