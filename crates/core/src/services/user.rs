//! User service.

use crate::services::activity_log::{ActivityLogService, LogContext, RecordEntry};
use crate::services::identity::ResolvedIdentity;
use prepvault_common::{AppError, AppResult, IdGenerator};
use prepvault_db::{
    entities::{
        activity_log::{ActivityAction, TargetType},
        user::{self, Role},
    },
    repositories::UserRepository,
};
use sea_orm::Set;
use serde_json::json;

/// User service for identity upserts, token auth, and the admin directory.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    activity_log: ActivityLogService,
    id_gen: IdGenerator,
    superadmin_enrollment: String,
}

/// Decide the role a user holds after login.
///
/// The configured superadmin enrollment number always maps to superadmin;
/// everyone else keeps whatever role is stored.
fn resolve_role(stored: Role, enrollment: &str, superadmin_enrollment: &str) -> Role {
    if enrollment == superadmin_enrollment {
        Role::SuperAdmin
    } else {
        stored
    }
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        activity_log: ActivityLogService,
        superadmin_enrollment: String,
    ) -> Self {
        Self {
            user_repo,
            activity_log,
            id_gen: IdGenerator::new(),
            superadmin_enrollment,
        }
    }

    /// Upsert a user from a resolved identity and make sure they hold an
    /// access token.
    ///
    /// Profile fields are refreshed on every login; the enrollment number
    /// never changes. The superadmin invariant is applied on every pass so
    /// a reconfigured superadmin takes effect at next login.
    pub async fn login_with_identity(
        &self,
        identity: ResolvedIdentity,
        ctx: LogContext,
    ) -> AppResult<user::Model> {
        let existing = self
            .user_repo
            .find_by_enrollment(&identity.enrollment_number)
            .await?;

        if let Some(user) = existing {
            let role = resolve_role(
                user.role,
                &identity.enrollment_number,
                &self.superadmin_enrollment,
            );
            let token = match user.token {
                Some(ref t) => t.clone(),
                None => self.id_gen.generate_token(),
            };

            let mut model: user::ActiveModel = user.into();
            model.full_name = Set(identity.full_name);
            model.display_picture = Set(identity.display_picture);
            model.branch = Set(identity.branch);
            model.email = Set(identity.email);
            model.role = Set(role);
            model.token = Set(Some(token));
            model.updated_at = Set(Some(chrono::Utc::now().into()));

            let updated = self.user_repo.update(model).await?;
            tracing::info!(user_id = %updated.id, "User logged in");
            self.activity_log.record_detached(
                RecordEntry::new(ActivityAction::Login)
                    .actor(&updated)
                    .target(TargetType::User, &updated.id)
                    .describe(format!("{} logged in", updated.full_name))
                    .context(ctx),
            );
            return Ok(updated);
        }

        let role = resolve_role(
            Role::User,
            &identity.enrollment_number,
            &self.superadmin_enrollment,
        );

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            enrollment_number: Set(identity.enrollment_number),
            full_name: Set(identity.full_name),
            display_picture: Set(identity.display_picture),
            branch: Set(identity.branch),
            email: Set(identity.email),
            role: Set(role),
            token: Set(Some(self.id_gen.generate_token())),
            visited_question_ids: Set(json!([])),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.user_repo.create(model).await?;
        tracing::info!(user_id = %created.id, "New user registered");
        self.activity_log.record_detached(
            RecordEntry::new(ActivityAction::Login)
                .actor(&created)
                .target(TargetType::User, &created.id)
                .describe(format!("{} logged in for the first time", created.full_name))
                .context(ctx),
        );
        Ok(created)
    }

    /// Authenticate a user by access token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Invalidate a user's access token.
    pub async fn logout(&self, user_id: &str, ctx: LogContext) -> AppResult<()> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let name = user.full_name.clone();
        let snapshot = user.clone();
        let mut model: user::ActiveModel = user.into();
        model.token = Set(None);
        self.user_repo.update(model).await?;

        self.activity_log.record_detached(
            RecordEntry::new(ActivityAction::Logout)
                .actor(&snapshot)
                .target(TargetType::User, &snapshot.id)
                .describe(format!("{name} logged out"))
                .context(ctx),
        );
        Ok(())
    }

    /// Get a user by ID.
    pub async fn get(&self, user_id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(user_id).await
    }

    /// Find a user by enrollment number.
    pub async fn find_by_enrollment(&self, enrollment: &str) -> AppResult<Option<user::Model>> {
        self.user_repo.find_by_enrollment(enrollment).await
    }

    /// Search the user directory (admin view).
    pub async fn search_directory(
        &self,
        search: Option<&str>,
        role: Option<Role>,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<user::Model>, u64)> {
        let users = self.user_repo.search(search, role, limit, offset).await?;
        let total = self.user_repo.count_search(search, role).await?;
        Ok((users, total))
    }

    /// Change a user's role.
    ///
    /// Only `user` and `admin` can be assigned; superadmin accounts are
    /// untouchable (the invariant is enrollment-driven, not grantable).
    pub async fn update_role(
        &self,
        actor: &user::Model,
        target_user_id: &str,
        new_role: Role,
        ctx: LogContext,
    ) -> AppResult<user::Model> {
        if new_role == Role::SuperAdmin {
            return Err(AppError::Validation(
                "Role must be user or admin".to_string(),
            ));
        }

        let target = self.user_repo.get_by_id(target_user_id).await?;

        if target.role == Role::SuperAdmin {
            return Err(AppError::Forbidden(
                "Cannot change superadmin role".to_string(),
            ));
        }

        let previous_role = target.role;
        let mut model: user::ActiveModel = target.into();
        model.role = Set(new_role);
        model.updated_at = Set(Some(chrono::Utc::now().into()));

        let updated = self.user_repo.update(model).await?;
        tracing::info!(user_id = %updated.id, role = ?updated.role, "User role changed");

        self.activity_log.record_detached(
            RecordEntry::new(ActivityAction::UserRoleChange)
                .actor(actor)
                .target(TargetType::User, &updated.id)
                .target_info(json!({
                    "enrollmentNumber": updated.enrollment_number,
                    "previousRole": previous_role,
                    "newRole": updated.role,
                }))
                .describe(format!(
                    "{} changed {}'s role",
                    actor.full_name, updated.full_name
                ))
                .context(ctx),
        );
        Ok(updated)
    }

    /// Record that a user has visited a question.
    ///
    /// The visited set holds weak references; nothing is validated against
    /// the question store here.
    pub async fn mark_visited(&self, user_id: &str, question_id: &str) -> AppResult<user::Model> {
        let user = self.user_repo.get_by_id(user_id).await?;

        let mut visited: Vec<String> = user
            .visited_question_ids
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        if visited.iter().any(|id| id == question_id) {
            return Ok(user);
        }
        visited.push(question_id.to_string());

        let mut model: user::ActiveModel = user.into();
        model.visited_question_ids = Set(json!(visited));
        self.user_repo.update(model).await
    }

    /// Total registered users (dashboard stats).
    pub async fn count(&self) -> AppResult<u64> {
        self.user_repo.count().await
    }
}
