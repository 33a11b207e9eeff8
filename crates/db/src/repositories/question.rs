//! Question repository.

use std::sync::Arc;

use crate::entities::{Company, Question, company, question, user};
use prepvault_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    JoinType, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    sea_query::Expr, sea_query::extension::postgres::PgExpr,
};

/// Filter predicates for question search. Absent fields impose no
/// constraint.
#[derive(Debug, Clone, Default)]
pub struct QuestionSearchFilter {
    pub company_id: Option<String>,
    pub question_type: Option<question::QuestionType>,
    pub year: Option<i32>,
    /// Free text matched case-insensitively across body, suggestions,
    /// company name, and owner display name. The ranking tier classifier
    /// uses this same field set.
    pub free_text: Option<String>,
}

/// Sortable fields for question listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionSortKey {
    CreatedAt,
    Year,
    QuestionNumber,
    /// Sorts by the joined company's display name, not its id.
    CompanyName,
}

#[derive(FromQueryResult)]
struct MaxQuestionNumber {
    max_number: Option<i32>,
}

#[derive(FromQueryResult)]
struct CompanyQuestionCount {
    company_id: String,
    count: i64,
}

#[derive(FromQueryResult)]
struct TypeCount {
    question_type: question::QuestionType,
    count: i64,
}

/// Question repository for database operations.
#[derive(Clone)]
pub struct QuestionRepository {
    db: Arc<DatabaseConnection>,
}

impl QuestionRepository {
    /// Create a new question repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a question by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<question::Model>> {
        Question::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a question by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<question::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::QuestionNotFound(id.to_string()))
    }

    /// Highest question number currently assigned within a company,
    /// optionally ignoring one question (used when moving a question to a
    /// different company).
    pub async fn max_question_number(
        &self,
        company_id: &str,
        exclude_question_id: Option<&str>,
    ) -> AppResult<Option<i32>> {
        let mut query = Question::find()
            .select_only()
            .column_as(question::Column::QuestionNumber.max(), "max_number")
            .filter(question::Column::CompanyId.eq(company_id));

        if let Some(exclude) = exclude_question_id {
            query = query.filter(question::Column::Id.ne(exclude));
        }

        let row = query
            .into_model::<MaxQuestionNumber>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.and_then(|r| r.max_number))
    }

    /// Insert a question.
    ///
    /// A unique-index violation on (company, number) surfaces as `Conflict`
    /// so callers can retry the numbering race.
    pub async fn create(&self, model: question::ActiveModel) -> AppResult<question::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict("Question number already taken in this company".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a question.
    ///
    /// Same conflict mapping as `create`: renumbering into a different
    /// company can race too.
    pub async fn update(&self, model: question::ActiveModel) -> AppResult<question::Model> {
        model.update(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict("Question number already taken in this company".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Delete a question.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Question::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    fn build_condition(filter: &QuestionSearchFilter) -> Condition {
        let mut condition = Condition::all();

        if let Some(ref company_id) = filter.company_id {
            condition = condition.add(question::Column::CompanyId.eq(company_id.as_str()));
        }
        if let Some(question_type) = filter.question_type {
            condition = condition.add(question::Column::QuestionType.eq(question_type));
        }
        if let Some(year) = filter.year {
            condition = condition.add(question::Column::Year.eq(year));
        }
        if let Some(ref text) = filter.free_text {
            let pattern = format!("%{text}%");
            condition = condition.add(
                Condition::any()
                    .add(
                        Expr::col((question::Entity, question::Column::Body))
                            .ilike(pattern.clone()),
                    )
                    .add(
                        Expr::col((question::Entity, question::Column::Suggestions))
                            .ilike(pattern.clone()),
                    )
                    .add(Expr::col((company::Entity, company::Column::Name)).ilike(pattern.clone()))
                    .add(Expr::col((user::Entity, user::Column::FullName)).ilike(pattern)),
            );
        }

        condition
    }

    fn joined_query(
        filter: &QuestionSearchFilter,
    ) -> sea_orm::SelectTwo<question::Entity, company::Entity> {
        Question::find()
            .find_also_related(Company)
            .join(JoinType::LeftJoin, question::Relation::Owner.def())
            .filter(Self::build_condition(filter))
    }

    /// Fetch every question matching the filter, with its company. Used by
    /// the ranking engine when a free-text query requires in-memory
    /// tiering before pagination.
    pub async fn find_filtered_with_company(
        &self,
        filter: &QuestionSearchFilter,
    ) -> AppResult<Vec<(question::Model, Option<company::Model>)>> {
        Self::joined_query(filter)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch one page of questions with their companies, ordered in SQL.
    pub async fn find_page_with_company(
        &self,
        filter: &QuestionSearchFilter,
        sort: QuestionSortKey,
        order: Order,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<(question::Model, Option<company::Model>)>> {
        let mut query = Self::joined_query(filter);

        query = match sort {
            QuestionSortKey::CreatedAt => {
                query.order_by(question::Column::CreatedAt, order)
            }
            QuestionSortKey::Year => query
                .order_by(question::Column::Year, order)
                .order_by(question::Column::CreatedAt, Order::Desc),
            QuestionSortKey::QuestionNumber => query
                .order_by(question::Column::QuestionNumber, order)
                .order_by(question::Column::CreatedAt, Order::Desc),
            QuestionSortKey::CompanyName => query
                .order_by(Expr::col((company::Entity, company::Column::Name)), order)
                .order_by(question::Column::CreatedAt, Order::Desc),
        };

        query
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count questions matching the filter (pre-pagination total).
    pub async fn count_filtered(&self, filter: &QuestionSearchFilter) -> AppResult<u64> {
        Question::find()
            .join(JoinType::LeftJoin, question::Relation::Company.def())
            .join(JoinType::LeftJoin, question::Relation::Owner.def())
            .filter(Self::build_condition(filter))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Questions submitted by a user, newest first, with companies.
    pub async fn find_by_owner(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<(question::Model, Option<company::Model>)>> {
        Question::find()
            .find_also_related(Company)
            .filter(question::Column::SubmittedBy.eq(user_id))
            .order_by_desc(question::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all questions.
    pub async fn count(&self) -> AppResult<u64> {
        Question::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Question counts grouped by type.
    pub async fn count_by_type(&self) -> AppResult<Vec<(question::QuestionType, u64)>> {
        let rows = Question::find()
            .select_only()
            .column(question::Column::QuestionType)
            .column_as(question::Column::Id.count(), "count")
            .group_by(question::Column::QuestionType)
            .into_model::<TypeCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| (r.question_type, r.count.max(0) as u64))
            .collect())
    }

    /// Companies with the most questions, as (company id, count).
    pub async fn top_companies(&self, limit: u64) -> AppResult<Vec<(String, u64)>> {
        let rows = Question::find()
            .select_only()
            .column(question::Column::CompanyId)
            .column_as(question::Column::Id.count(), "count")
            .group_by(question::Column::CompanyId)
            .order_by(question::Column::Id.count(), Order::Desc)
            .limit(limit)
            .into_model::<CompanyQuestionCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| (r.company_id, r.count.max(0) as u64))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;

    fn test_question(id: &str, company_id: &str, number: i32) -> question::Model {
        question::Model {
            id: id.to_string(),
            submitted_by: Some("u1".to_string()),
            company_id: company_id.to_string(),
            question_number: number,
            question_type: question::QuestionType::Interview,
            other_type: None,
            month: 3,
            year: 2024,
            body: "<p>Reverse a linked list</p>".to_string(),
            suggestions: None,
            ownership_history: json!([]),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_max_question_number_present() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "max_number" => sea_orm::Value::Int(Some(4))
                }]])
                .into_connection(),
        );

        let repo = QuestionRepository::new(db);
        let max = repo.max_question_number("c1", None).await.unwrap();
        assert_eq!(max, Some(4));
    }

    #[tokio::test]
    async fn test_max_question_number_empty_company() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "max_number" => sea_orm::Value::Int(None)
                }]])
                .into_connection(),
        );

        let repo = QuestionRepository::new(db);
        let max = repo.max_question_number("c1", None).await.unwrap();
        assert_eq!(max, None);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<question::Model>::new()])
                .into_connection(),
        );

        let repo = QuestionRepository::new(db);
        let result = repo.get_by_id("missing").await;
        assert!(matches!(result, Err(AppError::QuestionNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = QuestionRepository::new(db);
        assert!(repo.delete("q1").await.is_ok());
    }

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

    #[tokio::test]
    async fn test_find_by_owner() {
        let q1 = test_question("q1", "c1", 1);
        let q2 = test_question("q2", "c1", 2);
        let acme = test_company("c1", "Acme");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![(q1, acme.clone()), (q2, acme)]])
                .into_connection(),
        );

        let repo = QuestionRepository::new(db);
        let results = repo.find_by_owner("u1").await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_some());
    }

    #[tokio::test]
    async fn test_count_filtered() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(3))
                }]])
                .into_connection(),
        );

        let repo = QuestionRepository::new(db);
        let filter = QuestionSearchFilter {
            year: Some(2024),
            ..Default::default()
        };
        assert_eq!(repo.count_filtered(&filter).await.unwrap(), 3);
    }
}
