//! Comment service.

use askanai_common::{AppError, AppResult, IdGenerator, normalize_text, sha256_hex};
use askanai_db::{
    entities::{
        comment::{self, CommentStatus},
        poll::PollStatus,
    },
    repositories::{CommentRepository, PollRepository},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::{
    access::{Caller, ResultsAccess, results_access},
    rate_limit::{EventKind, RateLimiter, Scope},
    validation::{first_failure, trim_in_place, trimmed_non_empty},
};

/// Most comments returned for one poll.
pub const COMMENT_LIST_LIMIT: u64 = 100;

/// Input for posting a comment.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateCommentInput {
    #[validate(length(min = 1, max = 2000))]
    pub body: String,

    #[validate(length(max = 100))]
    pub display_name: Option<String>,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    poll_repo: PollRepository,
    limiter: RateLimiter,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        poll_repo: PollRepository,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            comment_repo,
            poll_repo,
            limiter,
            id_gen: IdGenerator::new(),
        }
    }

    /// Post a comment on an open poll that allows comments.
    pub async fn create(
        &self,
        poll_id: &str,
        mut input: CreateCommentInput,
        caller: &Caller,
    ) -> AppResult<comment::Model> {
        trim_in_place(&mut input.body);
        input.display_name = trimmed_non_empty(input.display_name.take());
        input.validate().map_err(|e| {
            first_failure(
                &e,
                &[
                    ("body", "INVALID_COMMENT"),
                    ("displayName", "INVALID_DISPLAY_NAME"),
                    ("display_name", "INVALID_DISPLAY_NAME"),
                ],
            )
        })?;

        self.limiter
            .enforce(EventKind::CommentCreate, Scope::of(caller))
            .await?;

        let poll = self.poll_repo.get_active_by_id(poll_id).await?;
        if poll.status != PollStatus::Open || !poll.allow_comments {
            return Err(AppError::Forbidden("COMMENTS_DISABLED"));
        }

        let text_hash = sha256_hex(&normalize_text(&input.body));
        if self
            .comment_repo
            .is_duplicate(&poll.id, &text_hash, caller.user_id(), &caller.ip_hash)
            .await?
        {
            return Err(AppError::Conflict("DUPLICATE_COMMENT"));
        }

        let comment = self
            .comment_repo
            .create(comment::Model {
                id: self.id_gen.generate(),
                poll_id: poll.id,
                body: input.body,
                display_name: input.display_name,
                status: CommentStatus::Visible,
                user_id: caller.user_id.clone(),
                ip_hash: Some(caller.ip_hash.clone()),
                user_agent_hash: Some(caller.ua_hash.clone()),
                text_hash,
                created_at: Utc::now().fixed_offset(),
            })
            .await?;

        info!(poll_id = %comment.poll_id, comment_id = %comment.id, "Comment posted");
        Ok(comment)
    }

    /// Visible comments on a poll, newest first.
    ///
    /// Drafts and private polls are hidden from everyone but the owner and
    /// admins. Voters-only polls do not gate comments.
    pub async fn list(&self, poll_id: &str, caller: &Caller) -> AppResult<Vec<comment::Model>> {
        let poll = self.poll_repo.get_active_by_id(poll_id).await?;
        if results_access(&poll, caller, true) == ResultsAccess::Hidden {
            return Err(AppError::NotFound);
        }
        self.comment_repo
            .find_visible(&poll.id, COMMENT_LIST_LIMIT)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::test_support::{self, count_row, exec_ok, limiter_pass};
    use askanai_db::{entities::poll::VisibilityMode, repositories::AbuseEventRepository};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn service(db: MockDatabase) -> CommentService {
        let db = Arc::new(db.into_connection());
        CommentService::new(
            CommentRepository::new(db.clone()),
            PollRepository::new(db.clone()),
            RateLimiter::new(AbuseEventRepository::new(db)),
        )
    }

    fn input(body: &str) -> CreateCommentInput {
        CreateCommentInput {
            body: body.to_string(),
            display_name: None,
        }
    }

    fn caller() -> Caller {
        Caller::anonymous("ip", "ua")
    }

    #[tokio::test]
    async fn test_blank_body_rejected() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        assert!(matches!(
            svc.create("p1", input("   "), &caller()).await,
            Err(AppError::Validation("INVALID_COMMENT"))
        ));

        let long_name = CreateCommentInput {
            body: "hi".to_string(),
            display_name: Some("n".repeat(101)),
        };
        assert!(matches!(
            svc.create("p1", long_name, &caller()).await,
            Err(AppError::Validation("INVALID_DISPLAY_NAME"))
        ));
    }

    #[tokio::test]
    async fn test_comments_disabled() {
        let mut poll = test_support::poll("p1");
        poll.allow_comments = false;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(limiter_pass())
            .append_exec_results([exec_ok()])
            .append_query_results([vec![poll]]);

        let result = service(db).create("p1", input("Nice poll"), &caller()).await;
        assert!(matches!(result, Err(AppError::Forbidden("COMMENTS_DISABLED"))));
    }

    #[tokio::test]
    async fn test_duplicate_comment() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(limiter_pass())
            .append_exec_results([exec_ok()])
            .append_query_results([vec![test_support::poll("p1")]])
            .append_query_results([count_row(1)]);

        let result = service(db)
            .create("p1", input("  Nice   POLL "), &caller())
            .await;
        assert!(matches!(result, Err(AppError::Conflict("DUPLICATE_COMMENT"))));
    }

    #[tokio::test]
    async fn test_create_comment() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(limiter_pass())
            .append_exec_results([exec_ok()])
            .append_query_results([vec![test_support::poll("p1")]])
            .append_query_results([count_row(0)])
            .append_exec_results([exec_ok()]);

        let comment = service(db)
            .create("p1", input(" Nice poll "), &caller())
            .await
            .unwrap();

        assert_eq!(comment.body, "Nice poll");
        assert_eq!(comment.status, CommentStatus::Visible);
        assert_eq!(comment.text_hash, sha256_hex("nice poll"));
    }

    #[tokio::test]
    async fn test_private_poll_comments_hidden() {
        let mut poll = test_support::poll("p1");
        poll.visibility_mode = VisibilityMode::Private;
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![poll]]);

        let result = service(db).list("p1", &caller()).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }
}
