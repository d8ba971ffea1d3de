//! Response and answer repository.

use std::sync::Arc;

use crate::entities::{Answer, Response, answer, response};
use askanai_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QuerySelect, RelationTrait, TransactionTrait,
};

/// Response repository for database operations.
#[derive(Clone)]
pub struct ResponseRepository {
    db: Arc<DatabaseConnection>,
}

impl ResponseRepository {
    /// Create a new response repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a response and its answers in one transaction.
    ///
    /// A uniqueness violation on the response row is reported as
    /// `Conflict("ALREADY_VOTED")`.
    pub async fn create_with_answers(
        &self,
        response: response::Model,
        answers: Vec<answer::Model>,
    ) -> AppResult<response::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Response::insert(response::ActiveModel::from(response.clone()))
            .exec_without_returning(&txn)
            .await
            .map_err(|e| crate::unique_violation_as(e, "ALREADY_VOTED"))?;

        if !answers.is_empty() {
            Answer::insert_many(answers.into_iter().map(answer::ActiveModel::from))
                .exec_without_returning(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(response)
    }

    /// Whether the caller already responded to a poll.
    ///
    /// Signed-in callers are matched by user id, anonymous callers by IP hash.
    pub async fn has_responded(
        &self,
        poll_id: &str,
        user_id: Option<&str>,
        ip_hash: &str,
    ) -> AppResult<bool> {
        let mut query = Response::find().filter(response::Column::PollId.eq(poll_id));
        query = match user_id {
            Some(user_id) => query.filter(response::Column::UserId.eq(user_id)),
            None => query.filter(response::Column::IpHash.eq(ip_hash)),
        };
        let count = query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Count responses to a poll.
    pub async fn count_by_poll(&self, poll_id: &str) -> AppResult<u64> {
        Response::find()
            .filter(response::Column::PollId.eq(poll_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all responses.
    pub async fn count_all(&self) -> AppResult<u64> {
        Response::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All answers submitted to a poll, without the owning response rows.
    pub async fn answers_for_poll(&self, poll_id: &str) -> AppResult<Vec<answer::Model>> {
        Answer::find()
            .join(JoinType::InnerJoin, answer::Relation::Response.def())
            .filter(response::Column::PollId.eq(poll_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
