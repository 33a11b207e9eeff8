//! Company tips.
//!
//! Tips are flat parent-referencing rows in storage. The reply tree is
//! produced by an explicit map-then-link build at read time, so there is
//! no recursive object graph to maintain and a malformed parent chain can
//! at worst orphan a subtree, never loop.

use crate::services::activity_log::{ActivityLogService, LogContext, RecordEntry};
use prepvault_common::{AppError, AppResult, IdGenerator, sanitize};
use prepvault_db::{
    entities::{
        activity_log::{ActivityAction, TargetType},
        company_tip, user,
    },
    repositories::{CompanyRepository, CompanyTipRepository, UserRepository},
};
use sea_orm::Set;
use std::collections::HashMap;

/// A tip with its author resolved and replies attached.
#[derive(Debug, Clone)]
pub struct TipNode {
    pub tip: company_tip::Model,
    pub author: Option<user::Model>,
    pub replies: Vec<TipNode>,
}

/// Company tip service.
#[derive(Clone)]
pub struct TipService {
    tip_repo: CompanyTipRepository,
    company_repo: CompanyRepository,
    user_repo: UserRepository,
    activity_log: ActivityLogService,
    id_gen: IdGenerator,
}

impl TipService {
    /// Create a new tip service.
    #[must_use]
    pub const fn new(
        tip_repo: CompanyTipRepository,
        company_repo: CompanyRepository,
        user_repo: UserRepository,
        activity_log: ActivityLogService,
    ) -> Self {
        Self {
            tip_repo,
            company_repo,
            user_repo,
            activity_log,
            id_gen: IdGenerator::new(),
        }
    }

    /// All tips for a company as a reply tree, newest roots first.
    pub async fn list_tree(&self, company_id: &str) -> AppResult<Vec<TipNode>> {
        let tips = self.tip_repo.find_by_company(company_id).await?;

        let author_ids: Vec<String> = tips.iter().map(|t| t.author_id.clone()).collect();
        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(build_tree(tips, &authors))
    }

    /// Post a tip (root when `parent_tip_id` is None, reply otherwise).
    pub async fn create(
        &self,
        company_id: &str,
        author: &user::Model,
        content: &str,
        parent_tip_id: Option<String>,
        ctx: LogContext,
    ) -> AppResult<company_tip::Model> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }

        let company = self.company_repo.get_by_id(company_id).await?;

        if let Some(ref parent_id) = parent_tip_id {
            let parent = self.tip_repo.get_by_id(parent_id).await?;
            if parent.company_id != company.id {
                return Err(AppError::BadRequest(
                    "Parent tip belongs to a different company".to_string(),
                ));
            }
        }

        let model = company_tip::ActiveModel {
            id: Set(self.id_gen.generate()),
            company_id: Set(company.id.clone()),
            author_id: Set(author.id.clone()),
            content: Set(sanitize::sanitize_rich_text(content)),
            parent_tip_id: Set(parent_tip_id),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let tip = self.tip_repo.create(model).await?;

        self.activity_log.record_detached(
            RecordEntry::new(ActivityAction::TipCreate)
                .actor(author)
                .target(TargetType::Tip, &tip.id)
                .target_info(serde_json::json!({ "companyName": company.name }))
                .describe(format!(
                    "{} posted a tip for \"{}\"",
                    author.full_name, company.name
                ))
                .context(ctx),
        );

        Ok(tip)
    }

    fn authorize(tip: &company_tip::Model, actor: &user::Model) -> AppResult<()> {
        if tip.author_id == actor.id || actor.role.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only the author or an admin can modify this tip".to_string(),
            ))
        }
    }

    /// Edit a tip's content (author or admin).
    pub async fn update(
        &self,
        tip_id: &str,
        actor: &user::Model,
        content: &str,
        ctx: LogContext,
    ) -> AppResult<company_tip::Model> {
        let tip = self.tip_repo.get_by_id(tip_id).await?;
        Self::authorize(&tip, actor)?;

        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }

        let mut model: company_tip::ActiveModel = tip.into();
        model.content = Set(sanitize::sanitize_rich_text(content));
        model.updated_at = Set(Some(chrono::Utc::now().into()));

        let updated = self.tip_repo.update(model).await?;

        self.activity_log.record_detached(
            RecordEntry::new(ActivityAction::TipUpdate)
                .actor(actor)
                .target(TargetType::Tip, &updated.id)
                .describe(format!("{} updated a tip", actor.full_name))
                .context(ctx),
        );

        Ok(updated)
    }

    /// Delete a tip and its whole reply subtree (author or admin).
    pub async fn delete(
        &self,
        tip_id: &str,
        actor: &user::Model,
        ctx: LogContext,
    ) -> AppResult<()> {
        let tip = self.tip_repo.get_by_id(tip_id).await?;
        Self::authorize(&tip, actor)?;

        // Collect the subtree iteratively from the flat parent links.
        let all = self.tip_repo.find_by_company(&tip.company_id).await?;
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for t in &all {
            if let Some(ref parent) = t.parent_tip_id {
                children.entry(parent.clone()).or_default().push(t.id.clone());
            }
        }

        let mut to_delete = Vec::new();
        let mut stack = vec![tip.id.clone()];
        while let Some(id) = stack.pop() {
            if let Some(kids) = children.remove(&id) {
                stack.extend(kids);
            }
            to_delete.push(id);
        }

        self.activity_log
            .record(
                RecordEntry::new(ActivityAction::TipDelete)
                    .actor(actor)
                    .target(TargetType::Tip, &tip.id)
                    .target_info(serde_json::json!({
                        "content": tip.content,
                        "deletedWithReplies": to_delete.len() - 1,
                    }))
                    .describe(format!("{} deleted a tip", actor.full_name))
                    .context(ctx),
            )
            .await;

        self.tip_repo.delete_many(&to_delete).await?;
        Ok(())
    }
}

/// Link flat rows into a tree. Children inherit the input's newest-first
/// order; orphaned subtrees (dangling parent ids) are dropped.
fn build_tree(
    tips: Vec<company_tip::Model>,
    authors: &HashMap<String, user::Model>,
) -> Vec<TipNode> {
    let mut children: HashMap<String, Vec<company_tip::Model>> = HashMap::new();
    let mut roots = Vec::new();

    for tip in tips {
        match tip.parent_tip_id.clone() {
            Some(parent_id) => children.entry(parent_id).or_default().push(tip),
            None => roots.push(tip),
        }
    }

    roots
        .into_iter()
        .map(|root| link_node(root, &mut children, authors))
        .collect()
}

fn link_node(
    tip: company_tip::Model,
    children: &mut HashMap<String, Vec<company_tip::Model>>,
    authors: &HashMap<String, user::Model>,
) -> TipNode {
    let replies = children
        .remove(&tip.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| link_node(child, children, authors))
        .collect();

    let author = authors.get(&tip.author_id).cloned();
    TipNode {
        tip,
        author,
        replies,
    }
}
