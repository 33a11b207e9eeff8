//! Question search and ranking.
//!
//! Filtering is exact-match per field. When a free-text query is present,
//! every candidate gets a relevance tier by first-match-wins precedence
//! (company name, then owner name, then body/suggestions) and results are
//! ordered by tier before the caller's requested sort. The filter
//! predicate and the tier classifier deliberately share one field set, so
//! anything that matched the filter lands in a real tier.
//!
//! Free text is matched against the stored markup; tags are not stripped.

use prepvault_common::AppResult;
use prepvault_db::{
    entities::{company, question, user},
    repositories::{QuestionRepository, QuestionSearchFilter, QuestionSortKey, UserRepository},
};
use sea_orm::Order;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Maximum page size a caller may request.
const MAX_PAGE_SIZE: u64 = 100;

/// Fields a question listing can be sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    Year,
    QuestionNumber,
    /// Sorts by the joined company's display name.
    Company,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl From<SortDirection> for Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Self::Asc,
            SortDirection::Desc => Self::Desc,
        }
    }
}

/// Search request.
#[derive(Debug, Clone, Default)]
pub struct SearchQuestionsInput {
    pub company_id: Option<String>,
    pub question_type: Option<question::QuestionType>,
    pub year: Option<i32>,
    pub free_text: Option<String>,
    pub sort_by: SortField,
    pub sort_direction: SortDirection,
    /// 1-based page number.
    pub page: u64,
    pub page_size: u64,
}

/// One ranked search result.
#[derive(Debug, Clone)]
pub struct RankedQuestion {
    pub question: question::Model,
    pub company: company::Model,
    /// Relevance tier, present only for free-text searches. Lower is more
    /// relevant.
    pub tier: Option<u8>,
}

/// One page of results plus the pre-pagination total.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    /// Number of pages the total spans.
    #[must_use]
    pub const fn page_count(&self) -> u64 {
        self.total.div_ceil(self.page_size)
    }
}

/// Search service joining questions to companies and owners.
#[derive(Clone)]
pub struct SearchService {
    question_repo: QuestionRepository,
    user_repo: UserRepository,
}

impl SearchService {
    /// Create a new search service.
    #[must_use]
    pub const fn new(question_repo: QuestionRepository, user_repo: UserRepository) -> Self {
        Self {
            question_repo,
            user_repo,
        }
    }

    /// Run a search.
    pub async fn search(&self, input: SearchQuestionsInput) -> AppResult<Page<RankedQuestion>> {
        let page = input.page.max(1);
        let page_size = input.page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1) * page_size;

        let free_text = input
            .free_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);

        let filter = QuestionSearchFilter {
            company_id: input.company_id.clone(),
            question_type: input.question_type,
            year: input.year,
            free_text: free_text.clone(),
        };

        if let Some(ref needle) = free_text {
            return self
                .search_ranked(&filter, needle, input.sort_by, input.sort_direction, page, page_size)
                .await;
        }

        let total = self.question_repo.count_filtered(&filter).await?;
        let rows = self
            .question_repo
            .find_page_with_company(
                &filter,
                sort_key(input.sort_by),
                input.sort_direction.into(),
                page_size,
                offset,
            )
            .await?;

        let items = rows
            .into_iter()
            .filter_map(|(question, company)| {
                company.map(|company| RankedQuestion {
                    question,
                    company,
                    tier: None,
                })
            })
            .collect();

        Ok(Page {
            items,
            total,
            page,
            page_size,
        })
    }

    /// Free-text path: fetch the filtered set, classify tiers, rank, then
    /// paginate in memory. The total is the size of the ranked set.
    async fn search_ranked(
        &self,
        filter: &QuestionSearchFilter,
        needle: &str,
        sort_by: SortField,
        direction: SortDirection,
        page: u64,
        page_size: u64,
    ) -> AppResult<Page<RankedQuestion>> {
        let rows = self.question_repo.find_filtered_with_company(filter).await?;

        let owner_ids: Vec<String> = rows
            .iter()
            .filter_map(|(q, _)| q.submitted_by.clone())
            .collect();
        let owners: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&owner_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let needle_lower = needle.to_lowercase();
        let mut ranked: Vec<RankedQuestion> = rows
            .into_iter()
            .filter_map(|(question, company)| {
                company.map(|company| {
                    let owner_name = question
                        .submitted_by
                        .as_ref()
                        .and_then(|id| owners.get(id))
                        .map(|u| u.full_name.as_str());
                    let tier = classify_tier(&question, &company.name, owner_name, &needle_lower);
                    RankedQuestion {
                        question,
                        company,
                        tier: Some(tier),
                    }
                })
            })
            .collect();

        ranked.sort_by(|a, b| compare_ranked(a, b, sort_by, direction));

        let total = ranked.len() as u64;
        let items = ranked
            .into_iter()
            .skip(offset_for(page, page_size) as usize)
            .take(page_size as usize)
            .collect();

        Ok(Page {
            items,
            total,
            page,
            page_size,
        })
    }
}

const fn offset_for(page: u64, page_size: u64) -> u64 {
    (page - 1) * page_size
}

const fn sort_key(field: SortField) -> QuestionSortKey {
    match field {
        SortField::CreatedAt => QuestionSortKey::CreatedAt,
        SortField::Year => QuestionSortKey::Year,
        SortField::QuestionNumber => QuestionSortKey::QuestionNumber,
        SortField::Company => QuestionSortKey::CompanyName,
    }
}

/// Assign the relevance tier for one record, first match wins.
///
/// 1 = company name, 2 = owner display name, 3 = body or suggestions,
/// 4 = no tracked field matched (unreachable when the record passed the
/// free-text filter, which checks the same fields).
fn classify_tier(
    question: &question::Model,
    company_name: &str,
    owner_name: Option<&str>,
    needle_lower: &str,
) -> u8 {
    if company_name.to_lowercase().contains(needle_lower) {
        return 1;
    }
    if owner_name.is_some_and(|name| name.to_lowercase().contains(needle_lower)) {
        return 2;
    }
    if question.body.to_lowercase().contains(needle_lower)
        || question
            .suggestions
            .as_ref()
            .is_some_and(|s| s.to_lowercase().contains(needle_lower))
    {
        return 3;
    }
    4
}

/// Tier ascending first, then the requested sort field and direction.
fn compare_ranked(
    a: &RankedQuestion,
    b: &RankedQuestion,
    sort_by: SortField,
    direction: SortDirection,
) -> Ordering {
    let by_tier = a.tier.cmp(&b.tier);
    if by_tier != Ordering::Equal {
        return by_tier;
    }

    let by_field = match sort_by {
        SortField::CreatedAt => a.question.created_at.cmp(&b.question.created_at),
        SortField::Year => a.question.year.cmp(&b.question.year),
        SortField::QuestionNumber => a.question.question_number.cmp(&b.question.question_number),
        SortField::Company => a
            .company
            .name
            .to_lowercase()
            .cmp(&b.company.name.to_lowercase()),
    };

    match direction {
        SortDirection::Asc => by_field,
        SortDirection::Desc => by_field.reverse(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;
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

    fn test_question(id: &str, company_id: &str, body: &str) -> question::Model {
        question::Model {
            id: id.to_string(),
            submitted_by: Some("u1".to_string()),
            company_id: company_id.to_string(),
            question_number: 1,
            question_type: question::QuestionType::Interview,
            other_type: None,
            month: 3,
            year: 2024,
            body: body.to_string(),
            suggestions: None,
            ownership_history: json!([]),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn ranked(question: question::Model, company: company::Model, tier: u8) -> RankedQuestion {
        RankedQuestion {
            question,
            company,
            tier: Some(tier),
        }
    }

    #[test]
    fn test_tier_company_name_beats_body_mention() {
        // A question at Amazon whose body mentions Google must rank below
        // any question at Google itself.
        let google = test_company("c1", "Google");
        let amazon = test_company("c2", "Amazon");

        let at_google = test_question("q1", "c1", "<p>Median of two sorted arrays</p>");
        let at_amazon = test_question("q2", "c2", "<p>Asked the same thing as Google</p>");

        let tier_google = classify_tier(&at_google, &google.name, None, "google");
        let tier_amazon = classify_tier(&at_amazon, &amazon.name, None, "google");

        assert_eq!(tier_google, 1);
        assert_eq!(tier_amazon, 3);
        assert!(tier_google < tier_amazon);
    }

    #[test]
    fn test_tier_owner_name_is_second() {
        let company = test_company("c1", "Stripe");
        let question = test_question("q1", "c1", "<p>Parse an expression</p>");

        let tier = classify_tier(&question, &company.name, Some("Priya Google-Kumar"), "google");
        assert_eq!(tier, 2);
    }

    #[test]
    fn test_tier_matches_are_case_insensitive() {
        let company = test_company("c1", "Google");
        let question = test_question("q1", "c1", "<p>anything</p>");

        assert_eq!(classify_tier(&question, &company.name, None, "goo"), 1);
    }

    #[test]
    fn test_tier_suggestions_count_as_body() {
        let company = test_company("c1", "Stripe");
        let mut question = test_question("q1", "c1", "<p>Parse an expression</p>");
        question.suggestions = Some("<p>Think of Google's interview style</p>".to_string());

        assert_eq!(classify_tier(&question, &company.name, None, "google"), 3);
    }

    #[test]
    fn test_tier_fallback_when_nothing_matches() {
        let company = test_company("c1", "Stripe");
        let question = test_question("q1", "c1", "<p>Parse an expression</p>");

        assert_eq!(classify_tier(&question, &company.name, None, "netflix"), 4);
    }

    #[test]
    fn test_compare_ranked_tier_dominates_requested_sort() {
        let newer = {
            let mut q = test_question("q1", "c2", "<p>mentions Google</p>");
            q.created_at = (Utc::now() + Duration::hours(1)).into();
            q
        };
        let older = test_question("q2", "c1", "<p>anything</p>");

        let a = ranked(newer, test_company("c2", "Amazon"), 3);
        let b = ranked(older, test_company("c1", "Google"), 1);

        // Even with created_at desc requested, tier 1 sorts first.
        assert_eq!(
            compare_ranked(&a, &b, SortField::CreatedAt, SortDirection::Desc),
            Ordering::Greater
        );
    }

    #[test]
    fn test_compare_ranked_same_tier_uses_direction() {
        let q2023 = {
            let mut q = test_question("q1", "c1", "<p>x</p>");
            q.year = 2023;
            q
        };
        let q2024 = {
            let mut q = test_question("q2", "c1", "<p>x</p>");
            q.year = 2024;
            q
        };

        let a = ranked(q2023, test_company("c1", "Google"), 1);
        let b = ranked(q2024, test_company("c1", "Google"), 1);

        assert_eq!(
            compare_ranked(&a, &b, SortField::Year, SortDirection::Asc),
            Ordering::Less
        );
        assert_eq!(
            compare_ranked(&a, &b, SortField::Year, SortDirection::Desc),
            Ordering::Greater
        );
    }

    #[test]
    fn test_compare_ranked_company_sort_uses_name() {
        let a = ranked(
            test_question("q1", "c1", "<p>x</p>"),
            test_company("c1", "amazon"),
            1,
        );
        let b = ranked(
            test_question("q2", "c2", "<p>x</p>"),
            test_company("c2", "Google"),
            1,
        );

        // Case-insensitive name comparison, not id comparison.
        assert_eq!(
            compare_ranked(&a, &b, SortField::Company, SortDirection::Asc),
            Ordering::Less
        );
    }

    #[test]
    fn test_page_count_rounds_up() {
        let page = Page::<u32> {
            items: vec![],
            total: 41,
            page: 1,
            page_size: 20,
        };
        assert_eq!(page.page_count(), 3);
    }

    #[tokio::test]
    async fn test_search_without_free_text_uses_sql_pagination() {
        let acme = test_company("c1", "Acme");
        let q1 = test_question("q1", "c1", "<p>first</p>");
        let q2 = test_question("q2", "c1", "<p>second</p>");

        let question_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // count query first
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(2))
                }]])
                // then the page fetch
                .append_query_results([vec![(q1, acme.clone()), (q2, acme)]])
                .into_connection(),
        );
        let user_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = SearchService::new(
            QuestionRepository::new(question_db),
            UserRepository::new(user_db),
        );

        let page = service
            .search(SearchQuestionsInput {
                page: 1,
                page_size: 20,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].tier.is_none());
    }

    #[tokio::test]
    async fn test_search_with_free_text_ranks_and_totals() {
        let google = test_company("c1", "Google");
        let amazon = test_company("c2", "Amazon");
        let at_amazon = test_question("q1", "c2", "<p>Asked the same as Google</p>");
        let at_google = test_question("q2", "c1", "<p>Median of arrays</p>");

        let question_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![(at_amazon, amazon), (at_google, google)]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let service = SearchService::new(
            QuestionRepository::new(question_db),
            UserRepository::new(user_db),
        );

        let page = service
            .search(SearchQuestionsInput {
                free_text: Some("Google".to_string()),
                page: 1,
                page_size: 20,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        // Company-name hit ranks strictly before the body mention.
        assert_eq!(page.items[0].company.name, "Google");
        assert_eq!(page.items[0].tier, Some(1));
        assert_eq!(page.items[1].tier, Some(3));
    }
}
