//! Admin endpoints: role bootstrap and the moderation panel.

use askanai_common::AppResult;
use askanai_core::{PollListItem, TicketFilter};
use askanai_db::entities::poll::{PollStatus, VisibilityMode};
use axum::{
    Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AdminUser, JsonBody, MaybeAuthUser},
    middleware::AppState,
    response::{AdminCommentResponse, ApiResponse, OkResponse, PollResponse, TicketResponse, ok},
};

/// Paging and filter parameters shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub page: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
}

impl ListQuery {
    /// 1-based page number; anything unparseable is the first page.
    fn page(&self) -> u64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u64>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolveTicketRequest {
    pub admin_note: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub poll_count: u64,
    pub response_count: u64,
    pub comment_count: u64,
    pub open_ticket_count: u64,
    pub recent_polls: Vec<PollResponse>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPollResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub status: PollStatus,
    pub visibility: VisibilityMode,
    pub created_at: DateTime<FixedOffset>,
    pub response_count: i64,
}

impl From<PollListItem> for AdminPollResponse {
    fn from(PollListItem { poll, response_count }: PollListItem) -> Self {
        Self {
            id: poll.id,
            title: poll.title,
            slug: poll.slug,
            status: poll.status,
            visibility: poll.visibility_mode,
            created_at: poll.created_at,
            response_count,
        }
    }
}

#[derive(Serialize)]
pub struct PollsPage {
    pub polls: Vec<AdminPollResponse>,
    pub total: u64,
}

#[derive(Serialize)]
pub struct CommentsPage {
    pub comments: Vec<AdminCommentResponse>,
    pub total: u64,
}

#[derive(Serialize)]
pub struct TicketsPage {
    pub tickets: Vec<TicketResponse>,
    pub total: u64,
}

#[derive(Serialize)]
pub struct TicketUpdatedResponse {
    pub ok: bool,
    pub ticket: TicketResponse,
}

/// Grant the admin role to an allowlisted, signed-in user.
async fn bootstrap(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
) -> AppResult<ApiResponse<OkResponse>> {
    state.account_service.bootstrap_admin(user.as_ref()).await?;
    Ok(ok())
}

async fn stats(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<StatsResponse>> {
    let stats = state.moderation_service.stats().await?;

    Ok(ApiResponse::ok(StatsResponse {
        poll_count: stats.poll_count,
        response_count: stats.response_count,
        comment_count: stats.comment_count,
        open_ticket_count: stats.open_ticket_count,
        recent_polls: stats.recent_polls.into_iter().map(Into::into).collect(),
    }))
}

// ==================== Polls ====================

async fn list_polls(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<PollsPage>> {
    let page = state
        .moderation_service
        .list_polls(query.page(), query.search.clone(), query.status.as_deref())
        .await?;

    Ok(ApiResponse::ok(PollsPage {
        polls: page.items.into_iter().map(Into::into).collect(),
        total: page.total,
    }))
}

async fn set_poll_status(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<StatusRequest>,
) -> AppResult<ApiResponse<OkResponse>> {
    state
        .moderation_service
        .set_poll_status(&admin.id, &id, &req.status)
        .await?;
    Ok(ok())
}

// ==================== Comments ====================

async fn list_comments(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<CommentsPage>> {
    let page = state
        .moderation_service
        .list_comments(query.page(), query.status.as_deref(), query.search.clone())
        .await?;

    Ok(ApiResponse::ok(CommentsPage {
        comments: page.items.into_iter().map(Into::into).collect(),
        total: page.total,
    }))
}

async fn set_comment_status(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<StatusRequest>,
) -> AppResult<ApiResponse<OkResponse>> {
    state
        .moderation_service
        .set_comment_status(&admin.id, &id, &req.status)
        .await?;
    Ok(ok())
}

// ==================== Tickets ====================

async fn list_tickets(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<TicketsPage>> {
    let filter = TicketFilter::parse(query.status.as_deref())?;
    let page = state
        .moderation_service
        .list_tickets(query.page(), filter)
        .await?;

    Ok(ApiResponse::ok(TicketsPage {
        tickets: page.items.into_iter().map(Into::into).collect(),
        total: page.total,
    }))
}

async fn resolve_ticket(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ResolveTicketRequest>,
) -> AppResult<ApiResponse<TicketUpdatedResponse>> {
    let ticket = state
        .moderation_service
        .resolve_ticket(&admin.id, &id, req.admin_note)
        .await?;

    Ok(ApiResponse::ok(TicketUpdatedResponse {
        ok: true,
        ticket: ticket.into(),
    }))
}

async fn reopen_ticket(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<TicketUpdatedResponse>> {
    let ticket = state
        .moderation_service
        .reopen_ticket(&admin.id, &id)
        .await?;

    Ok(ApiResponse::ok(TicketUpdatedResponse {
        ok: true,
        ticket: ticket.into(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bootstrap", post(bootstrap))
        .route("/stats", get(stats))
        .route("/polls", get(list_polls))
        .route("/polls/{id}/status", post(set_poll_status))
        .route("/comments", get(list_comments))
        .route("/comments/{id}/status", post(set_comment_status))
        .route("/tickets", get(list_tickets))
        .route("/tickets/{id}/resolve", post(resolve_ticket))
        .route("/tickets/{id}/reopen", post(reopen_ticket))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_to_first() {
        let query = |page: Option<&str>| ListQuery {
            page: page.map(str::to_string),
            ..ListQuery::default()
        };
        assert_eq!(query(None).page(), 1);
        assert_eq!(query(Some("0")).page(), 1);
        assert_eq!(query(Some("abc")).page(), 1);
        assert_eq!(query(Some(" 3 ")).page(), 3);
    }
}
