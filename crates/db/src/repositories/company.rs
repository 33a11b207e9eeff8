//! Company repository.

use std::sync::Arc;

use crate::entities::{Company, company};
use prepvault_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr, sea_query::extension::postgres::PgExpr,
};

/// Company repository for database operations.
#[derive(Clone)]
pub struct CompanyRepository {
    db: Arc<DatabaseConnection>,
}

impl CompanyRepository {
    /// Create a new company repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a company by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<company::Model>> {
        Company::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a company by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<company::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::CompanyNotFound(id.to_string()))
    }

    /// Find a company by name, case-insensitively.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<company::Model>> {
        Company::find()
            .filter(company::Column::NameLower.eq(name.trim().to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find companies by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<company::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Company::find()
            .filter(company::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fuzzy-search companies by name, sorted alphabetically.
    pub async fn search_by_name(&self, search: Option<&str>, limit: u64) -> AppResult<Vec<company::Model>> {
        let mut query = Company::find();

        if let Some(text) = search {
            let pattern = format!("%{text}%");
            query = query.filter(Expr::col(company::Column::Name).ilike(pattern));
        }

        query
            .order_by_asc(company::Column::Name)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new company.
    pub async fn create(&self, model: company::ActiveModel) -> AppResult<company::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict("Company already exists".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a company.
    pub async fn update(&self, model: company::ActiveModel) -> AppResult<company::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all companies.
    pub async fn count(&self) -> AppResult<u64> {
        Company::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
