//! Company tip repository.

use std::sync::Arc;

use crate::entities::{CompanyTip, company_tip};
use prepvault_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Company tip repository for database operations.
#[derive(Clone)]
pub struct CompanyTipRepository {
    db: Arc<DatabaseConnection>,
}

impl CompanyTipRepository {
    /// Create a new company tip repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a tip by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<company_tip::Model>> {
        CompanyTip::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a tip by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<company_tip::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tip {id}")))
    }

    /// All tips for a company, newest first. The caller assembles the
    /// reply tree.
    pub async fn find_by_company(&self, company_id: &str) -> AppResult<Vec<company_tip::Model>> {
        CompanyTip::find()
            .filter(company_tip::Column::CompanyId.eq(company_id))
            .order_by_desc(company_tip::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a tip.
    pub async fn create(&self, model: company_tip::ActiveModel) -> AppResult<company_tip::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a tip.
    pub async fn update(&self, model: company_tip::ActiveModel) -> AppResult<company_tip::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a set of tips by id.
    pub async fn delete_many(&self, ids: &[String]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = CompanyTip::delete_many()
            .filter(company_tip::Column::Id.is_in(ids.to_vec()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_tip(id: &str, parent: Option<&str>) -> company_tip::Model {
        company_tip::Model {
            id: id.to_string(),
            company_id: "c1".to_string(),
            author_id: "u1".to_string(),
            content: "<p>Ask about the team</p>".to_string(),
            parent_tip_id: parent.map(ToString::to_string),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_company() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![test_tip("t1", None), test_tip("t2", Some("t1"))]])
                .into_connection(),
        );

        let repo = CompanyTipRepository::new(db);
        let tips = repo.find_by_company("c1").await.unwrap();
        assert_eq!(tips.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_many_empty_short_circuits() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let repo = CompanyTipRepository::new(db);
        assert_eq!(repo.delete_many(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_many() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 3,
                }])
                .into_connection(),
        );

        let repo = CompanyTipRepository::new(db);
        let deleted = repo
            .delete_many(&["t1".to_string(), "t2".to_string(), "t3".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 3);
    }
}
