//! Account endpoints.

use askanai_common::AppResult;
use askanai_core::CredentialsInput;
use axum::{Router, extract::State, routing::post};
use serde::Serialize;

use crate::{
    extractors::{JsonBody, RequestCaller},
    middleware::AppState,
    response::{ApiResponse, UserResponse},
};

/// Registration response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub ok: bool,
    pub mail_sent: bool,
    pub user: UserResponse,
}

/// Signed-in user.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInUser {
    pub id: String,
    pub email: String,
    pub is_admin: bool,
}

/// Sign-in response carrying the bearer token.
#[derive(Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub user: SignInUser,
}

/// Register a new account.
async fn register(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    JsonBody(req): JsonBody<CredentialsInput>,
) -> AppResult<ApiResponse<RegisterResponse>> {
    let registration = state.account_service.register(req, &caller).await?;

    Ok(ApiResponse::ok(RegisterResponse {
        ok: true,
        mail_sent: registration.mail_sent,
        user: registration.user.into(),
    }))
}

/// Sign in with email and password.
async fn signin(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    JsonBody(req): JsonBody<CredentialsInput>,
) -> AppResult<ApiResponse<SignInResponse>> {
    let signin = state.account_service.sign_in(req, &caller).await?;

    Ok(ApiResponse::ok(SignInResponse {
        token: signin.user.token,
        user: SignInUser {
            id: signin.user.id,
            email: signin.user.email,
            is_admin: signin.is_admin,
        },
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/signin", post(signin))
}
