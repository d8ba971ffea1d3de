//! Request extractors.

use std::net::SocketAddr;

use askanai_common::AppError;
use askanai_core::Caller;
use askanai_db::entities::user;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, FromRequest, FromRequestParts, Request},
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::middleware::{AppState, CREATOR_KEY_HEADER, Identity};

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Client IP: first `X-Forwarded-For` entry, then `X-Real-IP`,
/// `CF-Connecting-IP`, the socket peer, else `"unknown"`.
#[must_use]
pub fn client_ip(parts: &Parts) -> String {
    let forwarded = header_str(&parts.headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| header_str(&parts.headers, "x-real-ip"))
        .or_else(|| header_str(&parts.headers, "cf-connecting-ip"))
        .map(str::to_string)
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// The caller of any endpoint: hashed client fingerprint, optional user and
/// optional creator key.
#[derive(Debug, Clone)]
pub struct RequestCaller(pub Caller);

impl FromRequestParts<AppState> for RequestCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ip = client_ip(parts);
        let user_agent = header_str(&parts.headers, header::USER_AGENT.as_str()).unwrap_or_default();
        let identity = parts.extensions.get::<Identity>();

        Ok(Self(Caller {
            user_id: identity.map(|i| i.user.id.clone()),
            is_admin: identity.is_some_and(|i| i.is_admin),
            creator_key: header_str(&parts.headers, CREATOR_KEY_HEADER).map(str::to_string),
            ip_hash: state.hasher.ip_hash(&ip),
            ua_hash: state.hasher.ua_hash(user_agent),
        }))
    }
}

/// Optional authenticated user extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<user::Model>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts.extensions.get::<Identity>().map(|i| i.user.clone()),
        ))
    }
}

/// Signed-in user holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub user::Model);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<Identity>()
            .ok_or(AppError::Unauthorized)?;
        if !identity.is_admin {
            return Err(AppError::forbidden());
        }
        Ok(Self(identity.user.clone()))
    }
}

/// JSON body extractor.
///
/// An empty body reads as `{}`. Unparseable JSON is `INVALID_JSON`; JSON of
/// the wrong shape is `INVALID_INPUT`; a body over the length limit is
/// `PAYLOAD_TOO_LARGE`. The content type is not checked.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge,
                _ => AppError::Validation("INVALID_JSON"),
            })?;
        parse_body(&bytes).map(Self)
    }
}

fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    let body = if bytes.trim_ascii().is_empty() {
        b"{}".as_slice()
    } else {
        bytes
    };
    serde_json::from_slice(body).map_err(|e| match e.classify() {
        Category::Data => AppError::Validation("INVALID_INPUT"),
        Category::Io | Category::Syntax | Category::Eof => AppError::Validation("INVALID_JSON"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Body {
        #[serde(default)]
        name: Option<String>,
    }

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = HttpRequest::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_client_ip_precedence() {
        let p = parts(&[
            ("x-forwarded-for", " 1.1.1.1 , 2.2.2.2"),
            ("x-real-ip", "3.3.3.3"),
        ]);
        assert_eq!(client_ip(&p), "1.1.1.1");

        let p = parts(&[("x-real-ip", "3.3.3.3"), ("cf-connecting-ip", "4.4.4.4")]);
        assert_eq!(client_ip(&p), "3.3.3.3");

        let p = parts(&[("cf-connecting-ip", "4.4.4.4")]);
        assert_eq!(client_ip(&p), "4.4.4.4");

        let mut p = parts(&[]);
        assert_eq!(client_ip(&p), "unknown");
        p.extensions
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4000))));
        assert_eq!(client_ip(&p), "10.0.0.7");
    }

    #[test]
    fn test_parse_body() {
        let empty: Body = parse_body(b"  ").unwrap();
        assert!(empty.name.is_none());

        let named: Body = parse_body(br#"{"name":"x"}"#).unwrap();
        assert_eq!(named.name.as_deref(), Some("x"));

        assert!(matches!(
            parse_body::<Body>(b"{not json"),
            Err(AppError::Validation("INVALID_JSON"))
        ));
        assert!(matches!(
            parse_body::<Body>(br#"{"name": 5}"#),
            Err(AppError::Validation("INVALID_INPUT"))
        ));
    }

    #[tokio::test]
    async fn test_oversized_body_is_payload_too_large() {
        // axum's default body limit is 2 MiB
        let body = vec![b' '; 2 * 1024 * 1024 + 1];
        let req = HttpRequest::builder()
            .uri("/")
            .body(axum::body::Body::from(body))
            .unwrap();

        let result = JsonBody::<Body>::from_request(req, &()).await;
        assert!(matches!(result, Err(AppError::PayloadTooLarge)));
    }
}
