//! Poll endpoints: creation, responses, results, views, comments and reports.

use askanai_common::AppResult;
use askanai_core::{
    CreateCommentInput, CreatePollInput, PollResults, ReportInput, RespondInput, UpdatePollInput,
};
use axum::{
    Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use serde::Serialize;

use crate::{
    extractors::{JsonBody, RequestCaller},
    middleware::AppState,
    response::{
        ApiResponse, CommentResponse, OkResponse, PollResponse, QuestionResponse,
        SubmittedResponse, ok,
    },
};

/// Poll creation response. The creator key is shown only here.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollResponse {
    pub poll: PollResponse,
    pub questions: Vec<QuestionResponse>,
    pub creator_key: String,
}

/// Poll with its questions.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDetailResponse {
    pub poll: PollResponse,
    pub questions: Vec<QuestionResponse>,
    pub is_owner: bool,
}

#[derive(Serialize)]
pub struct UpdatePollResponse {
    pub poll: PollResponse,
}

#[derive(Serialize)]
pub struct RespondResponse {
    pub success: bool,
    pub response: SubmittedResponse,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HasVotedResponse {
    pub has_voted: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewCountResponse {
    pub view_count: u64,
}

#[derive(Serialize)]
pub struct CommentCreatedResponse {
    pub comment: CommentResponse,
}

#[derive(Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<CommentResponse>,
}

/// Create a poll.
async fn create_poll(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    JsonBody(req): JsonBody<CreatePollInput>,
) -> AppResult<ApiResponse<CreatePollResponse>> {
    let created = state.poll_service.create(req, &caller).await?;

    Ok(ApiResponse::ok(CreatePollResponse {
        poll: created.poll.into(),
        questions: created.questions.into_iter().map(Into::into).collect(),
        creator_key: created.creator_key,
    }))
}

/// Get a poll and its questions by share slug.
async fn get_by_slug(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(slug): Path<String>,
) -> AppResult<ApiResponse<PollDetailResponse>> {
    let detail = state.poll_service.get_by_slug(&slug, &caller).await?;

    Ok(ApiResponse::ok(PollDetailResponse {
        poll: detail.poll.into(),
        questions: detail.questions.into_iter().map(Into::into).collect(),
        is_owner: detail.is_owner,
    }))
}

async fn update_poll(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdatePollInput>,
) -> AppResult<ApiResponse<UpdatePollResponse>> {
    let poll = state.poll_service.update(&id, req, &caller).await?;
    Ok(ApiResponse::ok(UpdatePollResponse { poll: poll.into() }))
}

/// Archive a poll.
async fn delete_poll(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<OkResponse>> {
    state.poll_service.archive(&id, &caller).await?;
    Ok(ok())
}

/// Submit answers.
async fn respond(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<RespondInput>,
) -> AppResult<ApiResponse<RespondResponse>> {
    let response = state.response_service.respond(&id, req, &caller).await?;

    Ok(ApiResponse::ok(RespondResponse {
        success: true,
        response: response.into(),
    }))
}

/// Aggregated results.
async fn results(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PollResults>> {
    let results = state.response_service.results(&id, &caller).await?;
    Ok(ApiResponse::ok(results))
}

async fn has_voted(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<HasVotedResponse>> {
    let has_voted = state.response_service.has_voted(&id, &caller).await?;
    Ok(ApiResponse::ok(HasVotedResponse { has_voted }))
}

async fn record_view(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<OkResponse>> {
    state.poll_service.record_view(&id, &caller).await?;
    Ok(ok())
}

async fn view_count(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ViewCountResponse>> {
    let view_count = state.poll_service.view_count(&id).await?;
    Ok(ApiResponse::ok(ViewCountResponse { view_count }))
}

/// Post a comment.
async fn create_comment(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CreateCommentInput>,
) -> AppResult<ApiResponse<CommentCreatedResponse>> {
    let comment = state.comment_service.create(&id, req, &caller).await?;
    Ok(ApiResponse::ok(CommentCreatedResponse {
        comment: comment.into(),
    }))
}

/// Visible comments, newest first.
async fn list_comments(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CommentsResponse>> {
    let comments = state.comment_service.list(&id, &caller).await?;
    Ok(ApiResponse::ok(CommentsResponse {
        comments: comments.into_iter().map(Into::into).collect(),
    }))
}

/// File a report.
async fn report(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ReportInput>,
) -> AppResult<ApiResponse<OkResponse>> {
    state.ticket_service.report(&id, req, &caller).await?;
    Ok(ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_poll))
        .route("/by-slug/{slug}", get(get_by_slug))
        .route("/{id}/update", post(update_poll))
        .route("/{id}/delete", delete(delete_poll))
        .route("/{id}/respond", post(respond))
        .route("/{id}/results", get(results))
        .route("/{id}/has-voted", get(has_voted))
        .route("/{id}/view", post(record_view))
        .route("/{id}/view-count", get(view_count))
        .route("/{id}/comment", post(create_comment))
        .route("/{id}/comments", get(list_comments))
        .route("/{id}/report", post(report))
}
