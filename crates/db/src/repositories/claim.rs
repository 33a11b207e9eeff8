//! Claim repository.

use std::sync::Arc;

use crate::entities::{Claim, claim};
use prepvault_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Claim repository for database operations.
#[derive(Clone)]
pub struct ClaimRepository {
    db: Arc<DatabaseConnection>,
}

impl ClaimRepository {
    /// Create a new claim repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the claim a user holds on a question, if any.
    pub async fn find(&self, question_id: &str, user_id: &str) -> AppResult<Option<claim::Model>> {
        Claim::find()
            .filter(claim::Column::QuestionId.eq(question_id))
            .filter(claim::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All claims on a question, oldest first.
    pub async fn find_by_question(&self, question_id: &str) -> AppResult<Vec<claim::Model>> {
        Claim::find()
            .filter(claim::Column::QuestionId.eq(question_id))
            .order_by_asc(claim::Column::ClaimedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a claim.
    ///
    /// The (question, user) unique index turns a duplicate (including a
    /// concurrent double-submit) into `Conflict`.
    pub async fn create(&self, model: claim::ActiveModel) -> AppResult<claim::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict("Question already claimed".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Remove a claim. Returns whether a row was actually deleted.
    pub async fn delete(&self, question_id: &str, user_id: &str) -> AppResult<bool> {
        let result = Claim::delete_many()
            .filter(claim::Column::QuestionId.eq(question_id))
            .filter(claim::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Remove every claim on a question (question deletion cleanup).
    pub async fn delete_for_question(&self, question_id: &str) -> AppResult<u64> {
        let result = Claim::delete_many()
            .filter(claim::Column::QuestionId.eq(question_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Number of claims a user holds.
    pub async fn count_by_user(&self, user_id: &str) -> AppResult<u64> {
        Claim::find()
            .filter(claim::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
