//! Moderation service backing the admin panel.
//!
//! Callers are expected to have been checked for the admin role already.

use askanai_common::{AppError, AppResult};
use askanai_db::{
    entities::{
        comment::{self, CommentStatus},
        poll::{self, PollStatus},
        ticket::{self, TicketStatus},
    },
    repositories::{
        CommentFilter, CommentRepository, PollFilter, PollRepository, ResponseRepository,
        TicketRepository,
    },
};
use chrono::Utc;
use sea_orm::Set;
use tracing::info;

/// Rows per admin listing page.
pub const PAGE_SIZE: u64 = 20;

/// Polls shown on the dashboard.
pub const RECENT_POLLS: u64 = 5;

/// Dashboard counters.
#[derive(Debug, Clone)]
pub struct AdminStats {
    pub poll_count: u64,
    pub response_count: u64,
    pub comment_count: u64,
    pub open_ticket_count: u64,
    pub recent_polls: Vec<poll::Model>,
}

/// One page of a listing plus the unpaged total.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// A poll row in the admin listing.
#[derive(Debug, Clone)]
pub struct PollListItem {
    pub poll: poll::Model,
    pub response_count: i64,
}

/// Ticket listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TicketFilter {
    #[default]
    Open,
    Resolved,
    All,
}

impl TicketFilter {
    /// Parse a query value; absent means `Open`.
    pub fn parse(value: Option<&str>) -> AppResult<Self> {
        match value.map(str::trim) {
            None | Some("" | "open") => Ok(Self::Open),
            Some("resolved") => Ok(Self::Resolved),
            Some("all") => Ok(Self::All),
            Some(_) => Err(AppError::Validation("INVALID_STATUS")),
        }
    }

    const fn status(self) -> Option<TicketStatus> {
        match self {
            Self::Open => Some(TicketStatus::Open),
            Self::Resolved => Some(TicketStatus::Resolved),
            Self::All => None,
        }
    }
}

/// Offset of a 1-based page.
const fn offset(page: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(PAGE_SIZE)
}

fn parse_optional<T>(value: Option<&str>, parse: fn(&str) -> Option<T>) -> AppResult<Option<T>> {
    match value.map(str::trim).filter(|v| !v.is_empty() && *v != "all") {
        None => Ok(None),
        Some(v) => parse(v)
            .map(Some)
            .ok_or(AppError::Validation("INVALID_STATUS")),
    }
}

/// Moderation service.
#[derive(Clone)]
pub struct ModerationService {
    poll_repo: PollRepository,
    response_repo: ResponseRepository,
    comment_repo: CommentRepository,
    ticket_repo: TicketRepository,
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        response_repo: ResponseRepository,
        comment_repo: CommentRepository,
        ticket_repo: TicketRepository,
    ) -> Self {
        Self {
            poll_repo,
            response_repo,
            comment_repo,
            ticket_repo,
        }
    }

    /// Dashboard counters and the most recent polls.
    pub async fn stats(&self) -> AppResult<AdminStats> {
        Ok(AdminStats {
            poll_count: self.poll_repo.count_active().await?,
            response_count: self.response_repo.count_all().await?,
            comment_count: self
                .comment_repo
                .count_matching(&CommentFilter::default())
                .await?,
            open_ticket_count: self.ticket_repo.count(Some(TicketStatus::Open)).await?,
            recent_polls: self.poll_repo.find_recent(RECENT_POLLS).await?,
        })
    }

    // ========== Polls ==========

    /// Page through polls with their response counts.
    pub async fn list_polls(
        &self,
        page: u64,
        search: Option<String>,
        status: Option<&str>,
    ) -> AppResult<Page<PollListItem>> {
        let filter = PollFilter {
            status: parse_optional(status, PollStatus::parse)?,
            search: search.map(|s| s.trim().to_string()),
        };

        let polls = self
            .poll_repo
            .search(&filter, PAGE_SIZE, offset(page))
            .await?;
        let total = self.poll_repo.count_matching(&filter).await?;

        let ids: Vec<String> = polls.iter().map(|p| p.id.clone()).collect();
        let counts = self.poll_repo.response_counts(&ids).await?;

        Ok(Page {
            items: polls
                .into_iter()
                .map(|poll| PollListItem {
                    response_count: counts.get(&poll.id).copied().unwrap_or(0),
                    poll,
                })
                .collect(),
            total,
        })
    }

    /// Force a poll's status. Unlike owners, admins may move in any direction.
    pub async fn set_poll_status(&self, admin_id: &str, poll_id: &str, status: &str) -> AppResult<()> {
        let status = PollStatus::parse(status.trim()).ok_or(AppError::Validation("INVALID_STATUS"))?;
        let poll = self.poll_repo.get_active_by_id(poll_id).await?;

        let mut active: poll::ActiveModel = poll.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now().fixed_offset());
        self.poll_repo.update(active).await?;

        info!(admin_id = %admin_id, poll_id = %poll_id, status = ?status, "Poll status set by admin");
        Ok(())
    }

    // ========== Comments ==========

    /// Page through comments of every status.
    pub async fn list_comments(
        &self,
        page: u64,
        status: Option<&str>,
        search: Option<String>,
    ) -> AppResult<Page<comment::Model>> {
        let filter = CommentFilter {
            status: parse_optional(status, CommentStatus::parse)?,
            search: search.map(|s| s.trim().to_string()),
        };

        Ok(Page {
            items: self
                .comment_repo
                .search(&filter, PAGE_SIZE, offset(page))
                .await?,
            total: self.comment_repo.count_matching(&filter).await?,
        })
    }

    /// Hide, flag or restore a comment.
    pub async fn set_comment_status(
        &self,
        admin_id: &str,
        comment_id: &str,
        status: &str,
    ) -> AppResult<()> {
        let status =
            CommentStatus::parse(status.trim()).ok_or(AppError::Validation("INVALID_STATUS"))?;
        let comment = self
            .comment_repo
            .find_by_id(comment_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: comment::ActiveModel = comment.into();
        active.status = Set(status);
        self.comment_repo.update(active).await?;

        info!(admin_id = %admin_id, comment_id = %comment_id, status = ?status, "Comment status set");
        Ok(())
    }

    // ========== Tickets ==========

    /// Page through tickets, newest first.
    pub async fn list_tickets(&self, page: u64, filter: TicketFilter) -> AppResult<Page<ticket::Model>> {
        let status = filter.status();
        Ok(Page {
            items: self
                .ticket_repo
                .search(status, PAGE_SIZE, offset(page))
                .await?,
            total: self.ticket_repo.count(status).await?,
        })
    }

    /// Resolve a ticket, optionally leaving a note.
    pub async fn resolve_ticket(
        &self,
        admin_id: &str,
        ticket_id: &str,
        admin_note: Option<String>,
    ) -> AppResult<ticket::Model> {
        let ticket = self.get_ticket(ticket_id).await?;

        let mut active: ticket::ActiveModel = ticket.into();
        active.status = Set(TicketStatus::Resolved);
        active.admin_note = Set(admin_note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty()));
        active.resolved_at = Set(Some(Utc::now().fixed_offset()));
        let ticket = self.ticket_repo.update(active).await?;

        info!(admin_id = %admin_id, ticket_id = %ticket_id, "Ticket resolved");
        Ok(ticket)
    }

    /// Reopen a resolved ticket.
    pub async fn reopen_ticket(&self, admin_id: &str, ticket_id: &str) -> AppResult<ticket::Model> {
        let ticket = self.get_ticket(ticket_id).await?;

        let mut active: ticket::ActiveModel = ticket.into();
        active.status = Set(TicketStatus::Open);
        active.resolved_at = Set(None);
        let ticket = self.ticket_repo.update(active).await?;

        info!(admin_id = %admin_id, ticket_id = %ticket_id, "Ticket reopened");
        Ok(ticket)
    }

    async fn get_ticket(&self, ticket_id: &str) -> AppResult<ticket::Model> {
        self.ticket_repo
            .find_by_id(ticket_id)
            .await?
            .ok_or(AppError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::test_support::{self, count_row};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn service(db: MockDatabase) -> ModerationService {
        let db = Arc::new(db.into_connection());
        ModerationService::new(
            PollRepository::new(db.clone()),
            ResponseRepository::new(db.clone()),
            CommentRepository::new(db.clone()),
            TicketRepository::new(db),
        )
    }

    fn ticket(status: TicketStatus) -> ticket::Model {
        ticket::Model {
            id: "t1".to_string(),
            poll_id: Some("p1".to_string()),
            comment_id: None,
            ticket_type: "spam".to_string(),
            message: None,
            status,
            admin_note: None,
            resolved_at: None,
            ip_hash: Some("ip".to_string()),
            user_agent_hash: None,
            text_hash: None,
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_ticket_filter() {
        assert_eq!(TicketFilter::parse(None).unwrap(), TicketFilter::Open);
        assert_eq!(TicketFilter::parse(Some("all")).unwrap(), TicketFilter::All);
        assert_eq!(
            TicketFilter::parse(Some("resolved")).unwrap(),
            TicketFilter::Resolved
        );
        assert!(TicketFilter::parse(Some("closed")).is_err());
    }

    #[test]
    fn test_page_offsets() {
        assert_eq!(offset(0), 0);
        assert_eq!(offset(1), 0);
        assert_eq!(offset(3), 40);
    }

    #[tokio::test]
    async fn test_stats() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([count_row(4), count_row(12), count_row(3), count_row(1)])
            .append_query_results([vec![test_support::poll("p1")]]);

        let stats = service(db).stats().await.unwrap();
        assert_eq!(stats.poll_count, 4);
        assert_eq!(stats.response_count, 12);
        assert_eq!(stats.comment_count, 3);
        assert_eq!(stats.open_ticket_count, 1);
        assert_eq!(stats.recent_polls.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_statuses_rejected() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        assert!(matches!(
            svc.set_poll_status("admin", "p1", "archived").await,
            Err(AppError::Validation("INVALID_STATUS"))
        ));
        assert!(matches!(
            svc.set_comment_status("admin", "c1", "deleted").await,
            Err(AppError::Validation("INVALID_STATUS"))
        ));
        assert!(matches!(
            svc.list_polls(1, None, Some("bogus")).await,
            Err(AppError::Validation("INVALID_STATUS"))
        ));
    }

    #[tokio::test]
    async fn test_resolve_ticket() {
        let mut resolved = ticket(TicketStatus::Resolved);
        resolved.admin_note = Some("handled".to_string());
        resolved.resolved_at = Some(Utc::now().fixed_offset());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ticket(TicketStatus::Open)], vec![resolved]]);

        let ticket = service(db)
            .resolve_ticket("admin", "t1", Some(" handled ".to_string()))
            .await
            .unwrap();
        assert_eq!(ticket.status, TicketStatus::Resolved);
        assert_eq!(ticket.admin_note.as_deref(), Some("handled"));
    }

    #[tokio::test]
    async fn test_missing_ticket() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<ticket::Model>::new()]);

        let result = service(db).reopen_ticket("admin", "nope").await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }
}
