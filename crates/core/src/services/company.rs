//! Company service.

use crate::services::activity_log::{ActivityLogService, LogContext, RecordEntry};
use prepvault_common::{AppError, AppResult, IdGenerator, sanitize};
use prepvault_db::{
    entities::{
        activity_log::{ActivityAction, TargetType},
        company::{self, RolePosting},
        user,
    },
    repositories::CompanyRepository,
};
use sea_orm::Set;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

/// Input for creating a company.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyInput {
    #[validate(length(min = 1, max = 256))]
    pub name: String,
}

/// Input for updating company details (admin only).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyDetailsInput {
    /// New description (None = no change, Some(None) = clear).
    pub description: Option<Option<String>>,
    /// Replacement role postings (None = no change).
    pub roles: Option<Vec<RolePosting>>,
}

/// Company service for business logic.
#[derive(Clone)]
pub struct CompanyService {
    company_repo: CompanyRepository,
    activity_log: ActivityLogService,
    id_gen: IdGenerator,
}

impl CompanyService {
    /// Create a new company service.
    #[must_use]
    pub const fn new(company_repo: CompanyRepository, activity_log: ActivityLogService) -> Self {
        Self {
            company_repo,
            activity_log,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a company by ID.
    pub async fn get(&self, id: &str) -> AppResult<company::Model> {
        self.company_repo.get_by_id(id).await
    }

    /// Fuzzy-search companies by name.
    pub async fn search(&self, search: Option<&str>, limit: u64) -> AppResult<Vec<company::Model>> {
        self.company_repo.search_by_name(search, limit).await
    }

    /// Create a company.
    ///
    /// Name uniqueness is case-insensitive; a duplicate surfaces as
    /// `Conflict` whether caught by the pre-check or, under a concurrent
    /// double-submit, by the unique index on the lowercased name.
    pub async fn create(
        &self,
        actor: &user::Model,
        input: CreateCompanyInput,
        logo: Option<String>,
        ctx: LogContext,
    ) -> AppResult<company::Model> {
        input.validate()?;

        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Company name is required".to_string()));
        }

        if let Some(existing) = self.company_repo.find_by_name(name).await? {
            return Err(AppError::Conflict(format!(
                "Company \"{}\" already exists",
                existing.name
            )));
        }

        let model = company::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name.to_string()),
            name_lower: Set(name.to_lowercase()),
            logo: Set(logo),
            description: Set(None),
            roles: Set(json!([])),
            added_by: Set(actor.id.clone()),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let company = self.company_repo.create(model).await?;
        tracing::info!(company_id = %company.id, name = %company.name, "Company created");

        self.activity_log.record_detached(
            RecordEntry::new(ActivityAction::CompanyCreate)
                .actor(actor)
                .target(TargetType::Company, &company.id)
                .target_info(json!({ "name": company.name }))
                .describe(format!(
                    "{} created company \"{}\"",
                    actor.full_name, company.name
                ))
                .context(ctx),
        );

        Ok(company)
    }

    /// Update a company's logo URL (the blob already lives on the image
    /// host).
    pub async fn update_logo(
        &self,
        company_id: &str,
        actor: &user::Model,
        logo_url: String,
        ctx: LogContext,
    ) -> AppResult<company::Model> {
        let company = self.company_repo.get_by_id(company_id).await?;

        let mut model: company::ActiveModel = company.into();
        model.logo = Set(Some(logo_url));
        model.updated_at = Set(Some(chrono::Utc::now().into()));

        let updated = self.company_repo.update(model).await?;

        self.activity_log.record_detached(
            RecordEntry::new(ActivityAction::CompanyUpdate)
                .actor(actor)
                .target(TargetType::Company, &updated.id)
                .target_info(json!({ "name": updated.name }))
                .describe(format!(
                    "{} updated logo for \"{}\"",
                    actor.full_name, updated.name
                ))
                .context(ctx),
        );

        Ok(updated)
    }

    /// Update description and role postings (admin only).
    pub async fn update_details(
        &self,
        company_id: &str,
        actor: &user::Model,
        input: UpdateCompanyDetailsInput,
        ctx: LogContext,
    ) -> AppResult<company::Model> {
        let company = self.company_repo.get_by_id(company_id).await?;

        if let Some(ref roles) = input.roles {
            validate_role_postings(roles)?;
        }

        let mut model: company::ActiveModel = company.into();

        if let Some(description) = input.description {
            model.description = Set(sanitize::sanitize_optional(description.as_deref()));
        }
        if let Some(roles) = input.roles {
            model.roles = Set(json!(roles));
        }
        model.updated_at = Set(Some(chrono::Utc::now().into()));

        let updated = self.company_repo.update(model).await?;

        self.activity_log.record_detached(
            RecordEntry::new(ActivityAction::CompanyUpdate)
                .actor(actor)
                .target(TargetType::Company, &updated.id)
                .target_info(json!({ "name": updated.name }))
                .describe(format!(
                    "{} updated details for \"{}\"",
                    actor.full_name, updated.name
                ))
                .context(ctx),
        );

        Ok(updated)
    }

    /// Total companies (dashboard stats).
    pub async fn count(&self) -> AppResult<u64> {
        self.company_repo.count().await
    }
}

fn validate_role_postings(roles: &[RolePosting]) -> AppResult<()> {
    for posting in roles {
        if posting.role_name.trim().is_empty() {
            return Err(AppError::Validation("Role name is required".to_string()));
        }
        for branch in &posting.hiring_for.ug {
            if !company::UG_BRANCHES.contains(&branch.as_str()) {
                return Err(AppError::Validation(format!("Unknown UG branch: {branch}")));
            }
        }
        for branch in &posting.hiring_for.pg {
            if !company::PG_BRANCHES.contains(&branch.as_str()) {
                return Err(AppError::Validation(format!("Unknown PG branch: {branch}")));
            }
        }
        for branch in &posting.hiring_for.phd {
            if !company::PHD_BRANCHES.contains(&branch.as_str()) {
                return Err(AppError::Validation(format!("Unknown PhD branch: {branch}")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prepvault_db::entities::company::HiringBranches;
    use prepvault_db::entities::user::Role;
    use prepvault_db::repositories::ActivityLogRepository;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn test_company(id: &str, name: &str) -> company::Model {
        company::Model {
            id: id.to_string(),
            name: name.to_string(),
            name_lower: name.to_lowercase(),
            logo: None,
            description: None,
            roles: json!([]),
            added_by: "u1".to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_user(id: &str, role: Role) -> user::Model {
        user::Model {
            id: id.to_string(),
            enrollment_number: format!("EN-{id}"),
            full_name: format!("User {id}"),
            display_picture: None,
            branch: "CSE".to_string(),
            email: format!("{id}@example.edu"),
            role,
            token: None,
            visited_question_ids: json!([]),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service_with(company_db: Arc<DatabaseConnection>) -> CompanyService {
        let log_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        CompanyService::new(
            CompanyRepository::new(company_db),
            ActivityLogService::new(ActivityLogRepository::new(log_db)),
        )
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name_case_insensitively() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_company("c1", "Google")]])
                .into_connection(),
        );

        let actor = test_user("u1", Role::User);
        let service = service_with(db);
        let result = service
            .create(
                &actor,
                CreateCompanyInput {
                    name: "gOOgle".to_string(),
                },
                None,
                LogContext::default(),
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_trims_and_stores() {
        let created = test_company("c1", "Acme");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // No duplicate
                .append_query_results([Vec::<company::Model>::new()])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[created]])
                .into_connection(),
        );

        let actor = test_user("u1", Role::User);
        let service = service_with(db);
        let company = service
            .create(
                &actor,
                CreateCompanyInput {
                    name: "  Acme ".to_string(),
                },
                None,
                LogContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(company.name, "Acme");
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let actor = test_user("u1", Role::User);
        let service = service_with(Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        ));

        let result = service
            .create(
                &actor,
                CreateCompanyInput {
                    name: "   ".to_string(),
                },
                None,
                LogContext::default(),
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_role_postings_unknown_branch() {
        let posting = RolePosting {
            role_name: "SDE Intern".to_string(),
            day: Some("Day 1".to_string()),
            duration: Some(2),
            location: None,
            total_stipend: Some(100_000),
            total_one_time: None,
            stipend_breakdown: vec![],
            criteria: None,
            perks: None,
            hiring_for: HiringBranches {
                ug: vec!["B.Tech. (Underwater Basket Weaving)".to_string()],
                ..Default::default()
            },
        };

        let result = validate_role_postings(&[posting]);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_role_postings_known_branches() {
        let posting = RolePosting {
            role_name: "SDE Intern".to_string(),
            day: None,
            duration: None,
            location: None,
            total_stipend: None,
            total_one_time: None,
            stipend_breakdown: vec![],
            criteria: None,
            perks: None,
            hiring_for: HiringBranches {
                ug: vec!["B.Tech. (Computer Science and Engineering)".to_string()],
                pg: vec!["MCA".to_string()],
                phd: vec![],
            },
        };

        assert!(validate_role_postings(&[posting]).is_ok());
    }
}
