//! Poll view repository.

use std::sync::Arc;

use crate::entities::{PollView, poll_view};
use askanai_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    sea_query::OnConflict,
};

/// Poll view repository for database operations.
#[derive(Clone)]
pub struct PollViewRepository {
    db: Arc<DatabaseConnection>,
}

impl PollViewRepository {
    /// Create a new poll view repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record a view. Repeat views from the same IP hash are ignored.
    ///
    /// Returns whether a new row was written.
    pub async fn record(&self, model: poll_view::Model) -> AppResult<bool> {
        let rows = PollView::insert(poll_view::ActiveModel::from(model))
            .on_conflict(
                OnConflict::columns([poll_view::Column::PollId, poll_view::Column::IpHash])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows > 0)
    }

    /// Count distinct views of a poll.
    pub async fn count_by_poll(&self, poll_id: &str) -> AppResult<u64> {
        PollView::find()
            .filter(poll_view::Column::PollId.eq(poll_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
