//! Abuse event repository backing the rate limiter.

use std::sync::Arc;

use crate::entities::{AbuseEvent, abuse_event};
use askanai_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    prelude::DateTimeWithTimeZone,
};

/// Abuse event repository for database operations.
#[derive(Clone)]
pub struct AbuseEventRepository {
    db: Arc<DatabaseConnection>,
}

impl AbuseEventRepository {
    /// Create a new abuse event repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Count events of one type recorded since `since` for a scope.
    ///
    /// The scope is the user when `user_id` is set, else the IP hash, else
    /// rows carrying neither.
    pub async fn count_since(
        &self,
        event_type: &str,
        user_id: Option<&str>,
        ip_hash: Option<&str>,
        since: DateTimeWithTimeZone,
    ) -> AppResult<u64> {
        let mut query = AbuseEvent::find()
            .filter(abuse_event::Column::EventType.eq(event_type))
            .filter(abuse_event::Column::CreatedAt.gte(since));

        query = match (user_id, ip_hash) {
            (Some(user_id), _) => query.filter(abuse_event::Column::UserId.eq(user_id)),
            (None, Some(ip_hash)) => query.filter(abuse_event::Column::IpHash.eq(ip_hash)),
            (None, None) => query
                .filter(abuse_event::Column::IpHash.is_null())
                .filter(abuse_event::Column::UserId.is_null()),
        };

        query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record an event.
    pub async fn create(&self, model: abuse_event::Model) -> AppResult<()> {
        AbuseEvent::insert(abuse_event::ActiveModel::from(model))
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
