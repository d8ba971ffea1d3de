//! Shared fixtures for service tests.

use std::collections::BTreeMap;

use askanai_common::{
    Config,
    config::{DatabaseConfig, LogConfig, SecurityConfig, ServerConfig, StorageConfig},
};
use askanai_db::entities::poll::{self, PollStatus, VisibilityMode};
use chrono::Utc;
use sea_orm::MockExecResult;

pub fn count_row(n: i64) -> Vec<BTreeMap<&'static str, sea_orm::Value>> {
    vec![maplit::btreemap! { "num_items" => sea_orm::Value::BigInt(Some(n)) }]
}

/// Query results for a rate limit check that passes all three windows.
pub fn limiter_pass() -> [Vec<BTreeMap<&'static str, sea_orm::Value>>; 3] {
    [count_row(0), count_row(0), count_row(0)]
}

pub fn exec_ok() -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: 1,
    }
}

pub fn poll(id: &str) -> poll::Model {
    let now = Utc::now().fixed_offset();
    poll::Model {
        id: id.to_string(),
        slug: "ab12c".to_string(),
        title: "Lunch?".to_string(),
        description: None,
        status: PollStatus::Open,
        visibility_mode: VisibilityMode::Public,
        allow_comments: true,
        creator_key_hash: None,
        created_by_user_id: None,
        preview_image_url: None,
        open_until: None,
        close_after_responses: None,
        archived_at: None,
        archived_by_user_id: None,
        archive_reason: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn config(bootstrap: &[&str]) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            url: "https://askanai.example".to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://localhost/test".to_string(),
            max_connections: 10,
            min_connections: 1,
        },
        security: SecurityConfig {
            ip_hash_salt: "salt".to_string(),
            allowed_origins: vec![],
            bootstrap_admin_emails: bootstrap.iter().map(|s| (*s).to_string()).collect(),
        },
        storage: StorageConfig {
            base_url: "https://storage.example/storage/v1".to_string(),
            bucket: "poll-images".to_string(),
            signing_secret: "secret".to_string(),
            upload_url_ttl_secs: 7200,
        },
        mail: None,
        log: LogConfig::default(),
    }
}
