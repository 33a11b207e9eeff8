//! Question service.
//!
//! Owns question creation and per-company numbering, owner-or-admin
//! mutation, the ownership transfer trail, and the claim ledger.

use crate::services::activity_log::{ActivityLogService, LogContext, RecordEntry};
use prepvault_common::{AppError, AppResult, IdGenerator, sanitize};
use prepvault_db::{
    entities::{
        activity_log::{ActivityAction, TargetType},
        claim, company,
        question::{self, OwnershipTransfer, QuestionType},
        user,
    },
    repositories::{ClaimRepository, CompanyRepository, QuestionRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

/// How many times a numbering conflict is retried before giving up.
const NUMBERING_ATTEMPTS: u32 = 3;

/// Input for creating a question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionInput {
    pub company_id: String,

    pub question_type: QuestionType,

    /// Required when `question_type` is `others`.
    #[validate(length(max = 128))]
    pub other_type: Option<String>,

    #[validate(range(min = 1, max = 12))]
    pub month: i32,

    #[validate(range(min = 1990, max = 2100))]
    pub year: i32,

    #[validate(length(min = 1))]
    pub body: String,

    pub suggestions: Option<String>,
}

/// Input for updating a question. Omitted fields are untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionInput {
    pub company_id: Option<String>,
    pub question_type: Option<QuestionType>,
    pub other_type: Option<String>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub body: Option<String>,
    /// None = no change, Some(None) = clear, Some(Some(text)) = set.
    pub suggestions: Option<Option<String>>,
}

/// A question with its company denormalized for read efficiency.
#[derive(Debug, Clone)]
pub struct QuestionWithCompany {
    pub question: question::Model,
    pub company: company::Model,
}

/// Question service for business logic.
#[derive(Clone)]
pub struct QuestionService {
    question_repo: QuestionRepository,
    company_repo: CompanyRepository,
    user_repo: UserRepository,
    claim_repo: ClaimRepository,
    activity_log: ActivityLogService,
    id_gen: IdGenerator,
}

impl QuestionService {
    /// Create a new question service.
    #[must_use]
    pub const fn new(
        question_repo: QuestionRepository,
        company_repo: CompanyRepository,
        user_repo: UserRepository,
        claim_repo: ClaimRepository,
        activity_log: ActivityLogService,
    ) -> Self {
        Self {
            question_repo,
            company_repo,
            user_repo,
            claim_repo,
            activity_log,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a question by ID.
    pub async fn get(&self, id: &str) -> AppResult<question::Model> {
        self.question_repo.get_by_id(id).await
    }

    /// Get a question with its company.
    pub async fn get_with_company(&self, id: &str) -> AppResult<QuestionWithCompany> {
        let question = self.question_repo.get_by_id(id).await?;
        let company = self.company_repo.get_by_id(&question.company_id).await?;
        Ok(QuestionWithCompany { question, company })
    }

    /// Claims on a question, with the claiming users resolved.
    pub async fn claims(&self, question_id: &str) -> AppResult<Vec<(claim::Model, Option<user::Model>)>> {
        let claims = self.claim_repo.find_by_question(question_id).await?;
        let user_ids: Vec<String> = claims.iter().map(|c| c.user_id.clone()).collect();
        let users = self.user_repo.find_by_ids(&user_ids).await?;

        Ok(claims
            .into_iter()
            .map(|c| {
                let claimer = users.iter().find(|u| u.id == c.user_id).cloned();
                (c, claimer)
            })
            .collect())
    }

    /// Next free question number within a company.
    ///
    /// `exclude_question_id` ignores the question being moved when a
    /// company reassignment recomputes its number.
    async fn next_question_number(
        &self,
        company_id: &str,
        exclude_question_id: Option<&str>,
    ) -> AppResult<i32> {
        let max = self
            .question_repo
            .max_question_number(company_id, exclude_question_id)
            .await?;
        Ok(max.unwrap_or(0) + 1)
    }

    /// Create a question.
    ///
    /// The read-max/insert pair can race under concurrent submissions to
    /// the same company; the unique (company, number) index turns that
    /// into a `Conflict` which is retried with a freshly computed number.
    pub async fn create(
        &self,
        author_id: Option<&str>,
        actor: &user::Model,
        input: CreateQuestionInput,
        ctx: LogContext,
    ) -> AppResult<QuestionWithCompany> {
        input.validate()?;

        let other_type = validate_other_type(input.question_type, input.other_type.as_deref())?;

        let company = self.company_repo.get_by_id(&input.company_id).await?;

        let body = sanitize::sanitize_rich_text(&input.body);
        let suggestions = sanitize::sanitize_optional(input.suggestions.as_deref());

        let mut last_err = AppError::Internal("Numbering did not run".to_string());
        for attempt in 0..NUMBERING_ATTEMPTS {
            let number = self.next_question_number(&company.id, None).await?;

            let model = question::ActiveModel {
                id: Set(self.id_gen.generate()),
                submitted_by: Set(author_id.map(ToString::to_string)),
                company_id: Set(company.id.clone()),
                question_number: Set(number),
                question_type: Set(input.question_type),
                other_type: Set(other_type.clone()),
                month: Set(input.month),
                year: Set(input.year),
                body: Set(body.clone()),
                suggestions: Set(suggestions.clone()),
                ownership_history: Set(json!([])),
                created_at: Set(chrono::Utc::now().into()),
                updated_at: Set(None),
            };

            match self.question_repo.create(model).await {
                Ok(created) => {
                    let action = if author_id.is_some_and(|id| id != actor.id) {
                        ActivityAction::AdminAddQuestion
                    } else {
                        ActivityAction::QuestionCreate
                    };
                    self.activity_log.record_detached(
                        RecordEntry::new(action)
                            .actor(actor)
                            .target(TargetType::Question, &created.id)
                            .target_info(json!({
                                "questionNumber": created.question_number,
                                "company": company.name,
                            }))
                            .describe(format!(
                                "{} created {} #{}",
                                actor.full_name, company.name, created.question_number
                            ))
                            .context(ctx),
                    );
                    return Ok(QuestionWithCompany {
                        question: created,
                        company,
                    });
                }
                Err(AppError::Conflict(msg)) => {
                    tracing::debug!(
                        company_id = %company.id,
                        attempt,
                        "Question number conflict, retrying"
                    );
                    last_err = AppError::Conflict(msg);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err)
    }

    /// Owner-or-admin gate for mutating a question.
    ///
    /// Anonymous questions have no owner to satisfy, so only admins may
    /// touch them.
    fn authorize_mutation(question: &question::Model, actor: &user::Model) -> AppResult<()> {
        if actor.role.is_admin() {
            return Ok(());
        }
        match question.submitted_by {
            Some(ref owner) if *owner == actor.id => Ok(()),
            Some(_) => Err(AppError::Forbidden(
                "Only the owner or an admin can modify this question".to_string(),
            )),
            None => Err(AppError::Forbidden(
                "Only an admin can modify an anonymous question".to_string(),
            )),
        }
    }

    /// Update a question.
    ///
    /// Changing the company recomputes the question number in the new
    /// scope, with the same conflict-retry as creation.
    pub async fn update(
        &self,
        question_id: &str,
        actor: &user::Model,
        input: UpdateQuestionInput,
        ctx: LogContext,
    ) -> AppResult<QuestionWithCompany> {
        let question = self.question_repo.get_by_id(question_id).await?;
        Self::authorize_mutation(&question, actor)?;

        let effective_type = input.question_type.unwrap_or(question.question_type);
        let other_type = validate_other_type(
            effective_type,
            input
                .other_type
                .as_deref()
                .or(question.other_type.as_deref()),
        )?;

        if let Some(month) = input.month {
            if !(1..=12).contains(&month) {
                return Err(AppError::Validation("Month must be 1-12".to_string()));
            }
        }

        let company_changed = input
            .company_id
            .as_ref()
            .is_some_and(|c| *c != question.company_id);

        let target_company = match input.company_id {
            Some(ref new_company_id) if company_changed => {
                self.company_repo.get_by_id(new_company_id).await?
            }
            _ => self.company_repo.get_by_id(&question.company_id).await?,
        };

        let mut last_err = AppError::Internal("Numbering did not run".to_string());
        for attempt in 0..NUMBERING_ATTEMPTS {
            let mut model: question::ActiveModel = question.clone().into();

            if company_changed {
                let number = self
                    .next_question_number(&target_company.id, Some(&question.id))
                    .await?;
                model.company_id = Set(target_company.id.clone());
                model.question_number = Set(number);
            }

            model.question_type = Set(effective_type);
            model.other_type = Set(other_type.clone());
            if let Some(month) = input.month {
                model.month = Set(month);
            }
            if let Some(year) = input.year {
                model.year = Set(year);
            }
            if let Some(ref body) = input.body {
                model.body = Set(sanitize::sanitize_rich_text(body));
            }
            if let Some(ref suggestions) = input.suggestions {
                // Explicit null clears, a value replaces.
                model.suggestions = Set(sanitize::sanitize_optional(suggestions.as_deref()));
            }
            model.updated_at = Set(Some(chrono::Utc::now().into()));

            match self.question_repo.update(model).await {
                Ok(updated) => {
                    self.activity_log.record_detached(
                        RecordEntry::new(ActivityAction::QuestionUpdate)
                            .actor(actor)
                            .target(TargetType::Question, &updated.id)
                            .target_info(json!({
                                "questionNumber": updated.question_number,
                                "company": target_company.name,
                            }))
                            .describe(format!(
                                "{} updated {} #{}",
                                actor.full_name, target_company.name, updated.question_number
                            ))
                            .context(ctx),
                    );
                    return Ok(QuestionWithCompany {
                        question: updated,
                        company: target_company,
                    });
                }
                Err(AppError::Conflict(msg)) if company_changed => {
                    tracing::debug!(
                        company_id = %target_company.id,
                        attempt,
                        "Question number conflict on move, retrying"
                    );
                    last_err = AppError::Conflict(msg);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err)
    }

    /// Delete a question.
    ///
    /// The pre-delete snapshot goes to the activity log before the row is
    /// removed, so the trail keeps what was deleted; its claims are
    /// removed with it.
    pub async fn delete(
        &self,
        question_id: &str,
        actor: &user::Model,
        ctx: LogContext,
    ) -> AppResult<()> {
        let question = self.question_repo.get_by_id(question_id).await?;
        Self::authorize_mutation(&question, actor)?;

        self.activity_log
            .record(
                RecordEntry::new(ActivityAction::QuestionDelete)
                    .actor(actor)
                    .target(TargetType::Question, &question.id)
                    .target_info(json!(question))
                    .describe(format!(
                        "{} deleted question #{}",
                        actor.full_name, question.question_number
                    ))
                    .context(ctx),
            )
            .await;

        self.claim_repo.delete_for_question(&question.id).await?;
        self.question_repo.delete(&question.id).await?;
        tracing::info!(question_id = %question.id, "Question deleted");
        Ok(())
    }

    /// Transfer a question to a new owner, appending to the ownership
    /// trail.
    ///
    /// Admin-only. The new owner is addressed by enrollment number, the
    /// external handle. The history append and the owner change land in
    /// one row update.
    pub async fn transfer(
        &self,
        question_id: &str,
        actor: &user::Model,
        new_owner_enrollment: &str,
        ctx: LogContext,
    ) -> AppResult<question::Model> {
        if !actor.role.is_admin() {
            return Err(AppError::Forbidden(
                "Only admins can transfer questions".to_string(),
            ));
        }

        let question = self.question_repo.get_by_id(question_id).await?;

        let new_owner = self
            .user_repo
            .find_by_enrollment(new_owner_enrollment)
            .await?
            .ok_or_else(|| AppError::UserNotFound(new_owner_enrollment.to_string()))?;

        if question.submitted_by.as_deref() == Some(new_owner.id.as_str()) {
            return Err(AppError::Conflict(
                "User already owns this question".to_string(),
            ));
        }

        let mut history: Vec<OwnershipTransfer> =
            serde_json::from_value(question.ownership_history.clone()).unwrap_or_default();
        history.push(OwnershipTransfer {
            previous_owner: question.submitted_by.clone(),
            transferred_to: new_owner.id.clone(),
            transferred_by: actor.id.clone(),
            date: chrono::Utc::now(),
        });

        let mut model: question::ActiveModel = question.into();
        model.submitted_by = Set(Some(new_owner.id.clone()));
        model.ownership_history = Set(json!(history));
        model.updated_at = Set(Some(chrono::Utc::now().into()));

        let updated = self.question_repo.update(model).await?;

        self.activity_log.record_detached(
            RecordEntry::new(ActivityAction::QuestionTransfer)
                .actor(actor)
                .target(TargetType::Question, &updated.id)
                .target_info(json!({
                    "questionNumber": updated.question_number,
                    "transferredTo": new_owner.enrollment_number,
                }))
                .describe(format!(
                    "{} transferred question #{} to {}",
                    actor.full_name, updated.question_number, new_owner.full_name
                ))
                .context(ctx),
        );

        Ok(updated)
    }

    // ========== Claim Ledger ==========

    /// Claim a question for a user.
    ///
    /// A duplicate claim, including a concurrent double-submit, fails
    /// with `Conflict` and leaves a single ledger row.
    pub async fn claim(&self, question_id: &str, user_id: &str) -> AppResult<claim::Model> {
        let question = self.question_repo.get_by_id(question_id).await?;

        if self.claim_repo.find(&question.id, user_id).await?.is_some() {
            return Err(AppError::Conflict(
                "You have already claimed this question".to_string(),
            ));
        }

        let model = claim::ActiveModel {
            id: Set(self.id_gen.generate()),
            question_id: Set(question.id),
            user_id: Set(user_id.to_string()),
            claimed_at: Set(chrono::Utc::now().into()),
        };

        self.claim_repo.create(model).await
    }

    /// Remove a user's claim on a question.
    pub async fn unclaim(&self, question_id: &str, user_id: &str) -> AppResult<()> {
        let question = self.question_repo.get_by_id(question_id).await?;

        let removed = self.claim_repo.delete(&question.id, user_id).await?;
        if !removed {
            return Err(AppError::BadRequest(
                "You have not claimed this question".to_string(),
            ));
        }
        Ok(())
    }

    /// Admin: add a claim on behalf of an arbitrary user.
    pub async fn admin_add_claim(
        &self,
        question_id: &str,
        actor: &user::Model,
        target_user_id: &str,
    ) -> AppResult<claim::Model> {
        if !actor.role.is_admin() {
            return Err(AppError::Forbidden(
                "Only admins can manage claims for other users".to_string(),
            ));
        }

        let target = self.user_repo.get_by_id(target_user_id).await?;
        self.claim(question_id, &target.id).await
    }

    /// Admin: remove a claim on behalf of an arbitrary user.
    pub async fn admin_remove_claim(
        &self,
        question_id: &str,
        actor: &user::Model,
        target_user_id: &str,
    ) -> AppResult<()> {
        if !actor.role.is_admin() {
            return Err(AppError::Forbidden(
                "Only admins can manage claims for other users".to_string(),
            ));
        }

        let target = self.user_repo.get_by_id(target_user_id).await?;
        self.unclaim(question_id, &target.id).await
    }

    /// Questions submitted by a user, newest first.
    pub async fn my_questions(&self, user_id: &str) -> AppResult<Vec<QuestionWithCompany>> {
        let rows = self.question_repo.find_by_owner(user_id).await?;
        rows.into_iter()
            .map(|(question, company)| {
                company
                    .map(|company| QuestionWithCompany { question, company })
                    .ok_or_else(|| AppError::Internal("Question without company".to_string()))
            })
            .collect()
    }

    /// Number of claims the user holds.
    pub async fn my_claims_count(&self, user_id: &str) -> AppResult<u64> {
        self.claim_repo.count_by_user(user_id).await
    }

    /// Total questions (dashboard stats).
    pub async fn count(&self) -> AppResult<u64> {
        self.question_repo.count().await
    }

    /// Question counts by type (dashboard stats).
    pub async fn count_by_type(&self) -> AppResult<Vec<(QuestionType, u64)>> {
        self.question_repo.count_by_type().await
    }

    /// Companies with the most questions, names resolved (dashboard
    /// stats).
    pub async fn top_companies(&self, limit: u64) -> AppResult<Vec<(company::Model, u64)>> {
        let counts = self.question_repo.top_companies(limit).await?;
        let ids: Vec<String> = counts.iter().map(|(id, _)| id.clone()).collect();
        let companies = self.company_repo.find_by_ids(&ids).await?;

        Ok(counts
            .into_iter()
            .filter_map(|(id, count)| {
                companies
                    .iter()
                    .find(|c| c.id == id)
                    .cloned()
                    .map(|c| (c, count))
            })
            .collect())
    }
}

/// `other_type` is required exactly when the type is `others`; for any
/// other type it is dropped.
fn validate_other_type(
    question_type: QuestionType,
    other_type: Option<&str>,
) -> AppResult<Option<String>> {
    match question_type {
        QuestionType::Others => {
            let label = other_type
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    AppError::Validation(
                        "otherType is required when type is others".to_string(),
                    )
                })?;
            Ok(Some(label.to_string()))
        }
        _ => Ok(None),
    }
}
