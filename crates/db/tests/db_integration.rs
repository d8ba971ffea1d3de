//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `askanai_test`)
//!   `TEST_DB_PASSWORD` (default: `askanai_test`)
//!   `TEST_DB_NAME` (default: `askanai_test`)

#![allow(clippy::unwrap_used)]

use askanai_common::AppError;
use askanai_db::{
    entities::{
        poll::{self, PollStatus, VisibilityMode},
        poll_view, response,
    },
    repositories::{PollRepository, PollViewRepository, ResponseRepository},
    test_utils::{TestDatabase, TestDbConfig},
};
use chrono::Utc;

fn poll(id: &str, slug: &str) -> poll::Model {
    let now = Utc::now().fixed_offset();
    poll::Model {
        id: id.to_string(),
        slug: slug.to_string(),
        title: "Integration".to_string(),
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

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_second_response_from_same_user_conflicts() {
    let db = TestDatabase::create_unique().await.unwrap();
    let conn = db.shared_connection().await.unwrap();

    let polls = PollRepository::new(conn.clone());
    polls
        .create_with_questions(poll("p1", "abcde"), vec![])
        .await
        .unwrap();

    let responses = ResponseRepository::new(conn);
    let make = |id: &str| response::Model {
        id: id.to_string(),
        poll_id: "p1".to_string(),
        respondent_name: None,
        user_id: Some("u1".to_string()),
        ip_hash: Some("h".to_string()),
        user_agent_hash: None,
        created_at: Utc::now().fixed_offset(),
    };

    responses.create_with_answers(make("r1"), vec![]).await.unwrap();
    let second = responses.create_with_answers(make("r2"), vec![]).await;
    assert!(matches!(second, Err(AppError::Conflict("ALREADY_VOTED"))));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_second_anonymous_response_from_same_ip_conflicts() {
    let db = TestDatabase::create_unique().await.unwrap();
    let conn = db.shared_connection().await.unwrap();

    PollRepository::new(conn.clone())
        .create_with_questions(poll("p1", "fghij"), vec![])
        .await
        .unwrap();

    let responses = ResponseRepository::new(conn);
    let anonymous = |id: &str| response::Model {
        id: id.to_string(),
        poll_id: "p1".to_string(),
        respondent_name: None,
        user_id: None,
        ip_hash: Some("same-ip".to_string()),
        user_agent_hash: None,
        created_at: Utc::now().fixed_offset(),
    };

    responses
        .create_with_answers(anonymous("r1"), vec![])
        .await
        .unwrap();
    let second = responses.create_with_answers(anonymous("r2"), vec![]).await;
    assert!(matches!(second, Err(AppError::Conflict("ALREADY_VOTED"))));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_repeat_view_is_ignored() {
    let db = TestDatabase::create_unique().await.unwrap();
    let conn = db.shared_connection().await.unwrap();

    PollRepository::new(conn.clone())
        .create_with_questions(poll("p1", "vwxyz"), vec![])
        .await
        .unwrap();

    let views = PollViewRepository::new(conn);
    let view = |id: &str| poll_view::Model {
        id: id.to_string(),
        poll_id: "p1".to_string(),
        ip_hash: "h".to_string(),
        user_agent_hash: None,
        created_at: Utc::now().fixed_offset(),
    };

    assert!(views.record(view("v1")).await.unwrap());
    assert!(!views.record(view("v2")).await.unwrap());
    assert_eq!(views.count_by_poll("p1").await.unwrap(), 1);

    db.drop_database().await.unwrap();
}

#[test]
fn test_database_url_format() {
    let config = TestDbConfig {
        host: "testhost".to_string(),
        port: 5432,
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        database: "testdb".to_string(),
    };
    let url = config.database_url();
    assert!(url.starts_with("postgres://"));
    assert!(url.contains("testhost"));
    assert!(url.contains("5432"));
    assert!(url.contains("testdb"));
}

#[test]
fn test_postgres_url_format() {
    let config = TestDbConfig::default();
    let url = config.postgres_url();
    assert!(url.ends_with("/postgres"));
}
