//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use prepvault_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::Expr, sea_query::extension::postgres::PgExpr,
};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find a user by enrollment number.
    pub async fn find_by_enrollment(&self, enrollment: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::EnrollmentNumber.eq(enrollment))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by access token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find users by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Search the user directory (admin view).
    ///
    /// `search` matches name, enrollment number, email, or branch
    /// case-insensitively; `role` is an exact filter.
    pub async fn search(
        &self,
        search: Option<&str>,
        role: Option<user::Role>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user::Model>> {
        let mut condition = Condition::all();

        if let Some(text) = search {
            let pattern = format!("%{text}%");
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(user::Column::FullName).ilike(pattern.clone()))
                    .add(Expr::col(user::Column::EnrollmentNumber).ilike(pattern.clone()))
                    .add(Expr::col(user::Column::Email).ilike(pattern.clone()))
                    .add(Expr::col(user::Column::Branch).ilike(pattern)),
            );
        }

        if let Some(role) = role {
            condition = condition.add(user::Column::Role.eq(role));
        }

        User::find()
            .filter(condition)
            .order_by_desc(user::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count users matching the directory search.
    pub async fn count_search(
        &self,
        search: Option<&str>,
        role: Option<user::Role>,
    ) -> AppResult<u64> {
        let mut condition = Condition::all();

        if let Some(text) = search {
            let pattern = format!("%{text}%");
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(user::Column::FullName).ilike(pattern.clone()))
                    .add(Expr::col(user::Column::EnrollmentNumber).ilike(pattern.clone()))
                    .add(Expr::col(user::Column::Email).ilike(pattern.clone()))
                    .add(Expr::col(user::Column::Branch).ilike(pattern)),
            );
        }

        if let Some(role) = role {
            condition = condition.add(user::Column::Role.eq(role));
        }

        User::find()
            .filter(condition)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all users.
    pub async fn count(&self) -> AppResult<u64> {
        User::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    fn test_user(id: &str, enrollment: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            enrollment_number: enrollment.to_string(),
            full_name: "Test User".to_string(),
            display_picture: None,
            branch: "B.Tech. (Computer Science and Engineering)".to_string(),
            email: "test@example.edu".to_string(),
            role: user::Role::User,
            token: Some("token".to_string()),
            visited_question_ids: json!([]),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_enrollment_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("u1", "21114001")]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let user = repo.find_by_enrollment("21114001").await.unwrap();
        assert_eq!(user.unwrap().id, "u1");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.get_by_id("missing").await;
        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_short_circuits() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let repo = UserRepository::new(db);
        let result = repo.find_by_ids(&[]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(7))
                }]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert_eq!(repo.count().await.unwrap(), 7);
    }
}
