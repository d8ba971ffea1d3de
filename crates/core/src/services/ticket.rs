//! Ticket service: abuse and content reports filed by visitors.

use askanai_common::{AppError, AppResult, IdGenerator, normalize_text, sha256_hex};
use askanai_db::{
    entities::ticket::{self, TicketStatus},
    repositories::{PollRepository, TicketRepository},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::{
    access::Caller,
    rate_limit::{EventKind, RateLimiter, Scope},
    validation::{first_failure, trim_in_place, trimmed_non_empty},
};

/// Input for filing a report.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportInput {
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 64))]
    pub report_type: String,

    #[validate(length(max = 5000))]
    pub message: Option<String>,

    pub comment_id: Option<String>,
}

/// Duplicate-detection hash over type, message and comment id.
#[must_use]
pub fn report_hash(report_type: &str, message: Option<&str>, comment_id: Option<&str>) -> String {
    sha256_hex(&normalize_text(&format!(
        "{report_type}|{}|{}",
        message.unwrap_or_default(),
        comment_id.unwrap_or_default()
    )))
}

/// Ticket service for business logic.
#[derive(Clone)]
pub struct TicketService {
    ticket_repo: TicketRepository,
    poll_repo: PollRepository,
    limiter: RateLimiter,
    id_gen: IdGenerator,
}

impl TicketService {
    /// Create a new ticket service.
    #[must_use]
    pub const fn new(
        ticket_repo: TicketRepository,
        poll_repo: PollRepository,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            ticket_repo,
            poll_repo,
            limiter,
            id_gen: IdGenerator::new(),
        }
    }

    /// File a report about a poll or one of its comments.
    pub async fn report(
        &self,
        poll_id: &str,
        mut input: ReportInput,
        caller: &Caller,
    ) -> AppResult<ticket::Model> {
        trim_in_place(&mut input.report_type);
        input.message = trimmed_non_empty(input.message.take());
        input.comment_id = trimmed_non_empty(input.comment_id.take());
        input.validate().map_err(|e| {
            first_failure(
                &e,
                &[
                    ("type", "INVALID_TYPE"),
                    ("report_type", "INVALID_TYPE"),
                    ("message", "INVALID_MESSAGE"),
                ],
            )
        })?;

        let text_hash = report_hash(
            &input.report_type,
            input.message.as_deref(),
            input.comment_id.as_deref(),
        );

        self.limiter
            .enforce(EventKind::TicketCreate, Scope::of(caller))
            .await?;

        let poll = self.poll_repo.get_active_by_id(poll_id).await?;
        if self
            .ticket_repo
            .is_duplicate(&poll.id, &text_hash, &caller.ip_hash)
            .await?
        {
            return Err(AppError::Conflict("DUPLICATE_REPORT"));
        }

        let ticket = self
            .ticket_repo
            .create(ticket::Model {
                id: self.id_gen.generate(),
                poll_id: Some(poll.id),
                comment_id: input.comment_id,
                ticket_type: input.report_type,
                message: input.message,
                status: TicketStatus::Open,
                admin_note: None,
                resolved_at: None,
                ip_hash: Some(caller.ip_hash.clone()),
                user_agent_hash: Some(caller.ua_hash.clone()),
                text_hash: Some(text_hash),
                created_at: Utc::now().fixed_offset(),
            })
            .await?;

        info!(ticket_id = %ticket.id, ticket_type = %ticket.ticket_type, "Report filed");
        Ok(ticket)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::test_support::{self, count_row, exec_ok, limiter_pass};
    use askanai_db::repositories::AbuseEventRepository;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn service(db: MockDatabase) -> TicketService {
        let db = Arc::new(db.into_connection());
        TicketService::new(
            TicketRepository::new(db.clone()),
            PollRepository::new(db.clone()),
            RateLimiter::new(AbuseEventRepository::new(db)),
        )
    }

    fn report(kind: &str, message: Option<&str>) -> ReportInput {
        ReportInput {
            report_type: kind.to_string(),
            message: message.map(str::to_string),
            comment_id: None,
        }
    }

    #[test]
    fn test_report_hash_normalizes() {
        assert_eq!(
            report_hash("Spam", Some("Buy  NOW"), None),
            report_hash("spam", Some("buy now"), None)
        );
        assert_ne!(
            report_hash("spam", None, Some("c1")),
            report_hash("spam", None, Some("c2"))
        );
    }

    #[tokio::test]
    async fn test_type_is_required() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        let caller = Caller::anonymous("ip", "ua");

        assert!(matches!(
            svc.report("p1", report("  ", None), &caller).await,
            Err(AppError::Validation("INVALID_TYPE"))
        ));
        assert!(matches!(
            svc.report("p1", report(&"t".repeat(65), None), &caller).await,
            Err(AppError::Validation("INVALID_TYPE"))
        ));
        assert!(matches!(
            svc.report("p1", report("spam", Some(&"m".repeat(5001))), &caller).await,
            Err(AppError::Validation("INVALID_MESSAGE"))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_report() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(limiter_pass())
            .append_exec_results([exec_ok()])
            .append_query_results([vec![test_support::poll("p1")]])
            .append_query_results([count_row(1)]);

        let result = service(db)
            .report("p1", report("spam", None), &Caller::anonymous("ip", "ua"))
            .await;
        assert!(matches!(result, Err(AppError::Conflict("DUPLICATE_REPORT"))));
    }

    #[tokio::test]
    async fn test_report_opens_ticket() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(limiter_pass())
            .append_exec_results([exec_ok()])
            .append_query_results([vec![test_support::poll("p1")]])
            .append_query_results([count_row(0)])
            .append_exec_results([exec_ok()]);

        let ticket = service(db)
            .report("p1", report(" spam ", Some("  ")), &Caller::anonymous("ip", "ua"))
            .await
            .unwrap();

        assert_eq!(ticket.ticket_type, "spam");
        assert_eq!(ticket.message, None);
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.poll_id.as_deref(), Some("p1"));
    }
}
