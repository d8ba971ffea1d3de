//! Signed upload URLs for poll preview images.
//!
//! The object store verifies uploads against an HMAC-SHA256 token over
//! `{bucket}/{path}|{expires}` keyed by the shared signing secret.

use askanai_common::{AppError, AppResult, IdGenerator, config::StorageConfig, sha256_hex};
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::info;
use url::Url;

use super::{
    access::Caller,
    rate_limit::{EventKind, RateLimiter, Scope},
};

type HmacSha256 = Hmac<Sha256>;

/// A signed, time-limited upload target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUpload {
    /// Object path inside the bucket.
    pub path: String,
    pub token: String,
    pub signed_url: String,
    pub public_url: String,
    /// Non-secret correlation id derived from the path.
    pub key: String,
}

/// Unix timestamp `ttl_secs` after `now`.
fn expiry(now: DateTime<Utc>, ttl_secs: u64) -> AppResult<i64> {
    i64::try_from(ttl_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .map(|at| at.timestamp())
        .ok_or_else(|| AppError::Config(format!("storage.upload_url_ttl_secs out of range: {ttl_secs}")))
}

/// File extension for an accepted image content type.
#[must_use]
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Upload signing service.
#[derive(Clone)]
pub struct UploadService {
    config: StorageConfig,
    limiter: RateLimiter,
    id_gen: IdGenerator,
}

impl UploadService {
    /// Create a new upload service.
    #[must_use]
    pub const fn new(config: StorageConfig, limiter: RateLimiter) -> Self {
        Self {
            config,
            limiter,
            id_gen: IdGenerator::new(),
        }
    }

    /// Issue a signed upload URL for a preview image of `content_type`.
    pub async fn sign_poll_image_upload(
        &self,
        content_type: &str,
        caller: &Caller,
    ) -> AppResult<SignedUpload> {
        let ext = extension_for(content_type).ok_or(AppError::Validation("UNSUPPORTED_FILE_TYPE"))?;

        let scope = Scope::of(caller);
        self.limiter.enforce(EventKind::PollImageUpload, scope).await?;

        let path = format!("previews/{}.{ext}", self.id_gen.generate_uuid_v4());
        let expires = expiry(Utc::now(), self.config.upload_url_ttl_secs)?;
        let upload = self.sign(&path, expires)?;

        self.limiter
            .record(EventKind::PollImageUploadSigned, scope)
            .await?;

        info!(path = %upload.path, "Signed poll image upload");
        Ok(upload)
    }

    fn object_url(&self, kind: &str, path: &str) -> AppResult<Url> {
        let base = self.config.base_url.trim_end_matches('/');
        Url::parse(&format!("{base}/object/{kind}/{}/{path}", self.config.bucket))
            .map_err(|e| AppError::Config(format!("Invalid storage base url: {e}")))
    }

    fn sign(&self, path: &str, expires: i64) -> AppResult<SignedUpload> {
        let mut mac = HmacSha256::new_from_slice(self.config.signing_secret.as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid signing key: {e}")))?;
        mac.update(format!("{}/{path}|{expires}", self.config.bucket).as_bytes());
        let token = hex::encode(mac.finalize().into_bytes());

        let mut signed_url = self.object_url("upload/sign", path)?;
        signed_url
            .query_pairs_mut()
            .append_pair("token", &token)
            .append_pair("expires", &expires.to_string());

        Ok(SignedUpload {
            path: path.to_string(),
            signed_url: signed_url.into(),
            public_url: self.object_url("public", path)?.into(),
            key: sha256_hex(path),
            token,
        })
    }
}
