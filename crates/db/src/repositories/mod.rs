//! Database repositories.

mod activity_log;
mod claim;
mod company;
mod company_tip;
mod question;
mod user;

pub use activity_log::{ActivityLogFilter, ActivityLogRepository};
pub use claim::ClaimRepository;
pub use company::CompanyRepository;
pub use company_tip::CompanyTipRepository;
pub use question::{QuestionRepository, QuestionSearchFilter, QuestionSortKey};
pub use user::UserRepository;
