//! Ticket repository.

use std::sync::Arc;

use crate::entities::{
    Ticket,
    ticket::{self, TicketStatus},
};
use askanai_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};

/// Ticket repository for database operations.
#[derive(Clone)]
pub struct TicketRepository {
    db: Arc<DatabaseConnection>,
}

impl TicketRepository {
    /// Create a new ticket repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a ticket. A uniqueness violation is reported as `DUPLICATE_REPORT`.
    pub async fn create(&self, model: ticket::Model) -> AppResult<ticket::Model> {
        Ticket::insert(ticket::ActiveModel::from(model.clone()))
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| crate::unique_violation_as(e, "DUPLICATE_REPORT"))?;
        Ok(model)
    }

    /// Find a ticket by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<ticket::Model>> {
        Ticket::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether the same client already filed an identical report on a poll.
    pub async fn is_duplicate(
        &self,
        poll_id: &str,
        text_hash: &str,
        ip_hash: &str,
    ) -> AppResult<bool> {
        let count = Ticket::find()
            .filter(ticket::Column::PollId.eq(poll_id))
            .filter(ticket::Column::TextHash.eq(text_hash))
            .filter(ticket::Column::IpHash.eq(ip_hash))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Update a ticket.
    pub async fn update(&self, model: ticket::ActiveModel) -> AppResult<ticket::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn filtered(status: Option<TicketStatus>) -> Select<Ticket> {
        let mut query = Ticket::find();
        if let Some(status) = status {
            query = query.filter(ticket::Column::Status.eq(status));
        }
        query
    }

    /// Page through tickets, newest first.
    pub async fn search(
        &self,
        status: Option<TicketStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<ticket::Model>> {
        Self::filtered(status)
            .order_by_desc(ticket::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count tickets, optionally by status.
    pub async fn count(&self, status: Option<TicketStatus>) -> AppResult<u64> {
        Self::filtered(status)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
