//! API middleware.

#![allow(missing_docs)]

use std::sync::{Arc, LazyLock};

use askanai_common::{ClientHasher, Config};
use askanai_core::{
    AccountService, CommentService, MailerService, ModerationService, PollService, RateLimiter,
    ResponseService, TicketService, UploadService,
};
use askanai_db::{
    entities::user,
    repositories::{
        AbuseEventRepository, CommentRepository, PollRepository, PollViewRepository,
        ResponseRepository, TicketRepository, UserRepository,
    },
};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, Request, header},
    middleware::Next,
    response::Response,
};
use regex::Regex;
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
};
use tracing::{debug, warn};

#[allow(clippy::expect_used)]
static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Bearer\s+(.+)$").expect("valid regex"));

/// Header carrying the anonymous creator secret.
pub const CREATOR_KEY_HEADER: &str = "x-creator-key";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub account_service: AccountService,
    pub poll_service: PollService,
    pub response_service: ResponseService,
    pub comment_service: CommentService,
    pub ticket_service: TicketService,
    pub upload_service: UploadService,
    pub moderation_service: ModerationService,
    pub hasher: ClientHasher,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire every service onto one shared database handle.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: Arc<Config>, mailer: MailerService) -> Self {
        let poll_repo = PollRepository::new(db.clone());
        let response_repo = ResponseRepository::new(db.clone());
        let comment_repo = CommentRepository::new(db.clone());
        let ticket_repo = TicketRepository::new(db.clone());
        let limiter = RateLimiter::new(AbuseEventRepository::new(db.clone()));

        Self {
            account_service: AccountService::new(
                UserRepository::new(db.clone()),
                limiter.clone(),
                mailer,
                config.clone(),
            ),
            poll_service: PollService::new(
                poll_repo.clone(),
                PollViewRepository::new(db),
                limiter.clone(),
            ),
            response_service: ResponseService::new(
                poll_repo.clone(),
                response_repo.clone(),
                limiter.clone(),
            ),
            comment_service: CommentService::new(
                comment_repo.clone(),
                poll_repo.clone(),
                limiter.clone(),
            ),
            ticket_service: TicketService::new(ticket_repo.clone(), poll_repo.clone(), limiter.clone()),
            upload_service: UploadService::new(config.storage.clone(), limiter),
            moderation_service: ModerationService::new(
                poll_repo,
                response_repo,
                comment_repo,
                ticket_repo,
            ),
            hasher: ClientHasher::new(config.security.ip_hash_salt.clone()),
            config,
        }
    }
}

/// The signed-in user behind a request, attached by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: user::Model,
    pub is_admin: bool,
}

/// Token from an `Authorization: Bearer ...` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = BEARER_RE.captures(value.trim())?.get(1)?.as_str().trim();
    (!token.is_empty()).then_some(token)
}

/// Authentication middleware.
///
/// Unknown tokens and lookup failures leave the request anonymous; endpoints
/// that require a user reject it themselves.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(req.headers()).map(str::to_owned) {
        match state.account_service.authenticate_by_token(&token).await {
            Ok(Some(user)) => {
                let is_admin = state
                    .account_service
                    .is_admin(&user.id)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(error = %e, user_id = %user.id, "Role lookup failed; treating as non-admin");
                        false
                    });
                req.extensions_mut().insert(Identity { user, is_admin });
            }
            Ok(None) => debug!("Unknown bearer token"),
            Err(e) => warn!(error = %e, "Token lookup failed"),
        }
    }

    next.run(req).await
}

/// CORS policy: any origin when the allowlist is empty, otherwise only the
/// listed origins, with credentials.
#[must_use]
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static(CREATOR_KEY_HEADER),
        ]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
    }
}

/// `Cache-Control: no-store, max-age=0` on every response.
#[must_use]
pub fn no_store_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, max-age=0"),
    )
}

/// `Pragma: no-cache` on every response.
#[must_use]
pub fn no_cache_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(header::PRAGMA, HeaderValue::from_static("no-cache"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer   abc ")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
