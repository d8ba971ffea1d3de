//! API response types.

#![allow(missing_docs)]

use askanai_db::{
    entities::{
        comment::{self, CommentStatus},
        poll::{self, PollStatus, VisibilityMode},
        poll_option,
        question::{self, QuestionType},
        response,
        ticket::{self, TicketStatus},
        user,
    },
    repositories::QuestionWithOptions,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Success response: the payload is rendered as the JSON body with 200.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize>(pub T);

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response.
    pub const fn ok(data: T) -> Self {
        Self(data)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self.0)).into_response()
    }
}

/// `{"ok": true}`
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Empty success response.
#[must_use]
pub const fn ok() -> ApiResponse<OkResponse> {
    ApiResponse::ok(OkResponse { ok: true })
}

/// Public poll row. The creator key hash and archival columns never leave
/// the server.
#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub status: PollStatus,
    pub visibility_mode: VisibilityMode,
    pub allow_comments: bool,
    pub created_by_user_id: Option<String>,
    pub preview_image_url: Option<String>,
    pub open_until: Option<DateTime<FixedOffset>>,
    pub close_after_responses: Option<i32>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<poll::Model> for PollResponse {
    fn from(poll: poll::Model) -> Self {
        Self {
            id: poll.id,
            slug: poll.slug,
            title: poll.title,
            description: poll.description,
            status: poll.status,
            visibility_mode: poll.visibility_mode,
            allow_comments: poll.allow_comments,
            created_by_user_id: poll.created_by_user_id,
            preview_image_url: poll.preview_image_url,
            open_until: poll.open_until,
            close_after_responses: poll.close_after_responses,
            created_at: poll.created_at,
            updated_at: poll.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionResponse {
    pub id: String,
    pub label: String,
    pub position: i32,
}

impl From<poll_option::Model> for OptionResponse {
    fn from(option: poll_option::Model) -> Self {
        Self {
            id: option.id,
            label: option.label,
            position: option.position,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: String,
    pub position: i32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub prompt: String,
    pub is_required: bool,
    pub settings_json: Option<JsonValue>,
    pub options: Vec<OptionResponse>,
}

impl From<QuestionWithOptions> for QuestionResponse {
    fn from(QuestionWithOptions { question, options }: QuestionWithOptions) -> Self {
        let question::Model {
            id,
            position,
            question_type,
            prompt,
            is_required,
            settings_json,
            ..
        } = question;
        Self {
            id,
            position,
            question_type,
            prompt,
            is_required,
            settings_json,
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub poll_id: String,
    pub display_name: Option<String>,
    pub body: String,
    pub created_at: DateTime<FixedOffset>,
}

impl From<comment::Model> for CommentResponse {
    fn from(comment: comment::Model) -> Self {
        Self {
            id: comment.id,
            poll_id: comment.poll_id,
            display_name: comment.display_name,
            body: comment.body,
            created_at: comment.created_at,
        }
    }
}

/// Comment as seen by moderators.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCommentResponse {
    pub id: String,
    pub poll_id: String,
    pub display_name: Option<String>,
    pub body: String,
    pub status: CommentStatus,
    pub user_id: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<comment::Model> for AdminCommentResponse {
    fn from(comment: comment::Model) -> Self {
        Self {
            id: comment.id,
            poll_id: comment.poll_id,
            display_name: comment.display_name,
            body: comment.body,
            status: comment.status,
            user_id: comment.user_id,
            created_at: comment.created_at,
        }
    }
}

/// A stored response, without its answers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedResponse {
    pub id: String,
    pub poll_id: String,
    pub respondent_name: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<response::Model> for SubmittedResponse {
    fn from(response: response::Model) -> Self {
        Self {
            id: response.id,
            poll_id: response.poll_id,
            respondent_name: response.respondent_name,
            created_at: response.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub id: String,
    pub poll_id: Option<String>,
    pub comment_id: Option<String>,
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub message: Option<String>,
    pub status: TicketStatus,
    pub admin_note: Option<String>,
    pub resolved_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<ticket::Model> for TicketResponse {
    fn from(ticket: ticket::Model) -> Self {
        Self {
            id: ticket.id,
            poll_id: ticket.poll_id,
            comment_id: ticket.comment_id,
            ticket_type: ticket.ticket_type,
            message: ticket.message,
            status: ticket.status,
            admin_note: ticket.admin_note,
            resolved_at: ticket.resolved_at,
            created_at: ticket.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}
