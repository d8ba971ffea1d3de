//! Comment repository.

use std::sync::Arc;

use crate::entities::{
    Comment,
    comment::{self, CommentStatus},
};
use askanai_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};

/// Filter for the moderation comment listing.
#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub status: Option<CommentStatus>,
    /// Case-insensitive body substring.
    pub search: Option<String>,
}

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a comment. A uniqueness violation is reported as `DUPLICATE_COMMENT`.
    pub async fn create(&self, model: comment::Model) -> AppResult<comment::Model> {
        Comment::insert(comment::ActiveModel::from(model.clone()))
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| crate::unique_violation_as(e, "DUPLICATE_COMMENT"))?;
        Ok(model)
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether the same scope already posted a comment with this text hash.
    pub async fn is_duplicate(
        &self,
        poll_id: &str,
        text_hash: &str,
        user_id: Option<&str>,
        ip_hash: &str,
    ) -> AppResult<bool> {
        let mut query = Comment::find()
            .filter(comment::Column::PollId.eq(poll_id))
            .filter(comment::Column::TextHash.eq(text_hash));
        query = match user_id {
            Some(user_id) => query.filter(comment::Column::UserId.eq(user_id)),
            None => query.filter(comment::Column::IpHash.eq(ip_hash)),
        };
        let count = query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Visible comments on a poll, newest first.
    pub async fn find_visible(&self, poll_id: &str, limit: u64) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::PollId.eq(poll_id))
            .filter(comment::Column::Status.eq(CommentStatus::Visible))
            .order_by_desc(comment::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a comment.
    pub async fn update(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn filtered(filter: &CommentFilter) -> Select<Comment> {
        let mut query = Comment::find();
        if let Some(status) = filter.status {
            query = query.filter(comment::Column::Status.eq(status));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(super::contains_ci(comment::Column::Body, search));
        }
        query
    }

    /// Page through comments, newest first.
    pub async fn search(
        &self,
        filter: &CommentFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<comment::Model>> {
        Self::filtered(filter)
            .order_by_desc(comment::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count comments matching `filter`.
    pub async fn count_matching(&self, filter: &CommentFilter) -> AppResult<u64> {
        Self::filtered(filter)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
