//! Poll repository.

use std::{collections::HashMap, sync::Arc};

use crate::entities::{
    Poll, PollOption, Question, Response,
    poll::{self, PollStatus},
    poll_option, question, response,
};
use askanai_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, TransactionTrait, sea_query::Expr,
};

/// A question with its options in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionWithOptions {
    pub question: question::Model,
    pub options: Vec<poll_option::Model>,
}

/// Filter for the moderation poll listing.
#[derive(Debug, Clone, Default)]
pub struct PollFilter {
    pub status: Option<PollStatus>,
    /// Case-insensitive title substring.
    pub search: Option<String>,
}

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID, treating archived polls as missing.
    pub async fn find_active_by_id(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .filter(poll::Column::ArchivedAt.is_null())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a non-archived poll by ID, returning `NotFound` otherwise.
    pub async fn get_active_by_id(&self, id: &str) -> AppResult<poll::Model> {
        self.find_active_by_id(id).await?.ok_or(AppError::NotFound)
    }

    /// Find a non-archived poll by slug.
    pub async fn find_active_by_slug(&self, slug: &str) -> AppResult<Option<poll::Model>> {
        Poll::find()
            .filter(poll::Column::Slug.eq(slug))
            .filter(poll::Column::ArchivedAt.is_null())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether any poll, archived included, already uses `slug`.
    pub async fn slug_exists(&self, slug: &str) -> AppResult<bool> {
        let count = Poll::find()
            .filter(poll::Column::Slug.eq(slug))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Insert a poll with its questions and options in one transaction.
    pub async fn create_with_questions(
        &self,
        poll: poll::Model,
        questions: Vec<QuestionWithOptions>,
    ) -> AppResult<poll::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Poll::insert(poll::ActiveModel::from(poll.clone()))
            .exec_without_returning(&txn)
            .await
            .map_err(|e| crate::unique_violation_as(e, "SLUG_TAKEN"))?;

        let mut question_rows = Vec::with_capacity(questions.len());
        let mut option_rows = Vec::new();
        for QuestionWithOptions { question, options } in questions {
            question_rows.push(question::ActiveModel::from(question));
            option_rows.extend(options.into_iter().map(poll_option::ActiveModel::from));
        }

        if !question_rows.is_empty() {
            Question::insert_many(question_rows)
                .exec_without_returning(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        if !option_rows.is_empty() {
            PollOption::insert_many(option_rows)
                .exec_without_returning(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(poll)
    }

    /// Update a poll.
    pub async fn update(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Questions of a poll ordered by position, each with its ordered options.
    pub async fn find_questions(&self, poll_id: &str) -> AppResult<Vec<QuestionWithOptions>> {
        let questions = Question::find()
            .filter(question::Column::PollId.eq(poll_id))
            .order_by_asc(question::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if questions.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
        let options = PollOption::find()
            .filter(poll_option::Column::QuestionId.is_in(ids))
            .order_by_asc(poll_option::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut by_question: HashMap<String, Vec<poll_option::Model>> = HashMap::new();
        for option in options {
            by_question
                .entry(option.question_id.clone())
                .or_default()
                .push(option);
        }

        Ok(questions
            .into_iter()
            .map(|question| {
                let options = by_question.remove(&question.id).unwrap_or_default();
                QuestionWithOptions { question, options }
            })
            .collect())
    }

    /// Count non-archived polls.
    pub async fn count_active(&self) -> AppResult<u64> {
        Poll::find()
            .filter(poll::Column::ArchivedAt.is_null())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most recently created non-archived polls.
    pub async fn find_recent(&self, limit: u64) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .filter(poll::Column::ArchivedAt.is_null())
            .order_by_desc(poll::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn filtered(filter: &PollFilter) -> Select<Poll> {
        let mut query = Poll::find().filter(poll::Column::ArchivedAt.is_null());
        if let Some(status) = filter.status {
            query = query.filter(poll::Column::Status.eq(status));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(super::contains_ci(poll::Column::Title, search));
        }
        query
    }

    /// Page through non-archived polls, newest first.
    pub async fn search(
        &self,
        filter: &PollFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<poll::Model>> {
        Self::filtered(filter)
            .order_by_desc(poll::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count polls matching `filter`.
    pub async fn count_matching(&self, filter: &PollFilter) -> AppResult<u64> {
        Self::filtered(filter)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Response counts for the given polls. Polls without responses are absent.
    pub async fn response_counts(&self, poll_ids: &[String]) -> AppResult<HashMap<String, i64>> {
        if poll_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(String, i64)> = Response::find()
            .select_only()
            .column(response::Column::PollId)
            .column_as(Expr::col(response::Column::Id).count(), "response_count")
            .filter(response::Column::PollId.is_in(poll_ids.iter().cloned()))
            .group_by(response::Column::PollId)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::{poll::VisibilityMode, question::QuestionType};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn poll(id: &str) -> poll::Model {
        let now = Utc::now().fixed_offset();
        poll::Model {
            id: id.to_string(),
            slug: "ab12c".to_string(),
            title: "Lunch?".to_string(),
            description: None,
            status: PollStatus::Open,
            visibility_mode: VisibilityMode::Public,
            allow_comments: true,
            creator_key_hash: None,
            created_by_user_id: None,
            preview_image_url: None,
            open_until: None,
            close_after_responses: None,
            archived_at: None,
            archived_by_user_id: None,
            archive_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn question(id: &str, position: i32) -> question::Model {
        question::Model {
            id: id.to_string(),
            poll_id: "p1".to_string(),
            position,
            question_type: QuestionType::SingleChoice,
            prompt: "Pick one".to_string(),
            is_required: true,
            settings_json: None,
            created_at: Utc::now().fixed_offset(),
        }
    }

    fn option(id: &str, question_id: &str, position: i32, label: &str) -> poll_option::Model {
        poll_option::Model {
            id: id.to_string(),
            question_id: question_id.to_string(),
            position,
            label: label.to_string(),
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[tokio::test]
    async fn test_find_questions_groups_options() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![question("q1", 0), question("q2", 1)]])
            .append_query_results([vec![
                option("o1", "q1", 0, "A"),
                option("o2", "q1", 1, "B"),
                option("o3", "q2", 0, "C"),
            ]])
            .into_connection();

        let repo = PollRepository::new(Arc::new(db));
        let questions = repo.find_questions("p1").await.unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question.id, "q1");
        let labels: Vec<_> = questions[0].options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, ["A", "B"]);
        assert_eq!(questions[1].options.len(), 1);
    }

    #[tokio::test]
    async fn test_create_with_questions_runs_in_transaction() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
            ])
            .into_connection();

        let repo = PollRepository::new(Arc::new(db));
        let created = repo
            .create_with_questions(
                poll("p1"),
                vec![QuestionWithOptions {
                    question: question("q1", 0),
                    options: vec![option("o1", "q1", 0, "A"), option("o2", "q1", 1, "B")],
                }],
            )
            .await
            .unwrap();

        assert_eq!(created.id, "p1");
    }

    #[tokio::test]
    async fn test_archived_poll_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<poll::Model>::new()])
            .into_connection();

        let repo = PollRepository::new(Arc::new(db));
        let result = repo.get_active_by_id("gone").await;

        assert!(matches!(result, Err(AppError::NotFound)));
    }
}
