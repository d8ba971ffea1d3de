//! Account service: registration, sign-in, token auth and admin bootstrap.

use std::sync::{Arc, LazyLock};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use askanai_common::{AppError, AppResult, Config, IdGenerator};
use askanai_db::{
    entities::{
        user,
        user_role::{self, AppRole},
    },
    repositories::UserRepository,
};
use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use super::{
    access::Caller,
    mailer::MailerService,
    rate_limit::{EventKind, RateLimiter, Scope},
};

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Maximum accepted email length.
const MAX_EMAIL_LEN: usize = 255;

/// Input for registration and sign-in.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CredentialsInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Result of a registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: user::Model,
    /// Whether the account notification mail went out.
    pub mail_sent: bool,
}

/// Result of a sign-in.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub user: user::Model,
    pub is_admin: bool,
}

/// Account service for business logic.
#[derive(Clone)]
pub struct AccountService {
    user_repo: UserRepository,
    limiter: RateLimiter,
    mailer: MailerService,
    config: Arc<Config>,
    id_gen: IdGenerator,
}

/// Trim and lower-case an email address.
#[must_use]
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

fn is_valid_password(password: &str) -> bool {
    (6..=128).contains(&password.chars().count())
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        limiter: RateLimiter,
        mailer: MailerService,
        config: Arc<Config>,
    ) -> Self {
        Self {
            user_repo,
            limiter,
            mailer,
            config,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create an account with email and password.
    ///
    /// The notification mail is best effort: a failure is logged and reported
    /// as `mail_sent == false`, never as an error.
    pub async fn register(&self, input: CredentialsInput, caller: &Caller) -> AppResult<Registration> {
        let email = normalize_email(input.email.as_deref().unwrap_or_default());
        let password = input.password.unwrap_or_default();

        if !is_valid_email(&email) {
            return Err(AppError::Validation("INVALID_EMAIL"));
        }
        if !is_valid_password(&password) {
            return Err(AppError::Validation("INVALID_PASSWORD"));
        }

        self.limiter
            .enforce(EventKind::AuthRegister, Scope::ip_only(caller))
            .await?;

        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("ALREADY_REGISTERED"));
        }

        let now = Utc::now().fixed_offset();
        let user = self
            .user_repo
            .create(user::Model {
                id: self.id_gen.generate(),
                email: email.clone(),
                password_hash: hash_password(&password)?,
                token: self.id_gen.generate_token(),
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(user_id = %user.id, "Account registered");

        let mail_sent = match self.mailer.send_account_created(&email).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(error = %e, user_id = %user.id, "Account email failed");
                false
            }
        };

        Ok(Registration { user, mail_sent })
    }

    /// Exchange email and password for the account's bearer token.
    pub async fn sign_in(&self, input: CredentialsInput, caller: &Caller) -> AppResult<SignIn> {
        let email = normalize_email(input.email.as_deref().unwrap_or_default());
        let password = input.password.unwrap_or_default();

        self.limiter
            .enforce(EventKind::AuthSignin, Scope::ip_only(caller))
            .await?;

        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        let is_admin = self.is_admin(&user.id).await?;
        Ok(SignIn { user, is_admin })
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        self.user_repo.find_by_token(token).await
    }

    /// Whether a user holds the admin role.
    pub async fn is_admin(&self, user_id: &str) -> AppResult<bool> {
        self.user_repo.has_role(user_id, AppRole::Admin).await
    }

    /// Grant the admin role to a user on the bootstrap allowlist.
    ///
    /// An empty allowlist disables the operation entirely (`NotFound`).
    pub async fn bootstrap_admin(&self, user: Option<&user::Model>) -> AppResult<()> {
        if self.config.security.bootstrap_admin_emails.is_empty() {
            return Err(AppError::NotFound);
        }
        let user = user.ok_or(AppError::Unauthorized)?;
        if !self.config.is_bootstrap_admin(&user.email) {
            warn!(user_id = %user.id, "Admin bootstrap refused");
            return Err(AppError::forbidden());
        }

        self.user_repo
            .grant_role(user_role::Model {
                id: self.id_gen.generate(),
                user_id: user.id.clone(),
                role: AppRole::Admin,
                created_at: Utc::now().fixed_offset(),
            })
            .await?;

        info!(user_id = %user.id, "Admin role granted");
        Ok(())
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::{
        mailer::{Mailer, NoOpMailer},
        test_support::{self, exec_ok, limiter_pass},
    };
    use askanai_db::repositories::AbuseEventRepository;
    use async_trait::async_trait;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send_account_created(&self, _user_email: &str) -> AppResult<bool> {
            Err(AppError::ExternalService("smtp down".to_string()))
        }
    }

    fn service(db: DatabaseConnection, mailer: MailerService, bootstrap: &[&str]) -> AccountService {
        let db = Arc::new(db);
        AccountService::new(
            UserRepository::new(db.clone()),
            RateLimiter::new(AbuseEventRepository::new(db)),
            mailer,
            Arc::new(test_support::config(bootstrap)),
        )
    }

    fn user(email: &str, password: &str) -> user::Model {
        let now = Utc::now().fixed_offset();
        user::Model {
            id: "u1".to_string(),
            email: email.to_string(),
            password_hash: hash_password(password).unwrap(),
            token: "tok".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn caller() -> Caller {
        Caller::anonymous("iphash", "uahash")
    }

    fn creds(email: &str, password: &str) -> CredentialsInput {
        CredentialsInput {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn test_email_rules() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
        assert!(!is_valid_email(&format!("{}@b.co", "a".repeat(260))));
        assert_eq!(normalize_email("  Foo@Bar.COM "), "foo@bar.com");
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_register_rejects_short_password_before_limiting() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let svc = service(db, Arc::new(NoOpMailer), &[]);

        let result = svc.register(creds("a@b.co", "123"), &caller()).await;
        assert!(matches!(result, Err(AppError::Validation("INVALID_PASSWORD"))));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(limiter_pass())
            .append_exec_results([exec_ok()])
            .append_query_results([vec![user("a@b.co", "secret1")]])
            .into_connection();
        let svc = service(db, Arc::new(NoOpMailer), &[]);

        let result = svc.register(creds("A@B.co", "secret1"), &caller()).await;
        assert!(matches!(result, Err(AppError::Conflict("ALREADY_REGISTERED"))));
    }

    #[tokio::test]
    async fn test_register_survives_mail_failure() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(limiter_pass())
            .append_exec_results([exec_ok()])
            .append_query_results([Vec::<user::Model>::new()])
            .append_exec_results([exec_ok()])
            .into_connection();
        let svc = service(db, Arc::new(FailingMailer), &[]);

        let registration = svc.register(creds("new@b.co", "secret1"), &caller()).await.unwrap();
        assert_eq!(registration.user.email, "new@b.co");
        assert!(!registration.mail_sent);
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(limiter_pass())
            .append_exec_results([exec_ok()])
            .append_query_results([vec![user("a@b.co", "secret1")]])
            .into_connection();
        let svc = service(db, Arc::new(NoOpMailer), &[]);

        let result = svc.sign_in(creds("a@b.co", "wrong!"), &caller()).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_bootstrap_rules() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let disabled = service(db, Arc::new(NoOpMailer), &[]);
        let someone = user("someone@b.co", "secret1");
        assert!(matches!(
            disabled.bootstrap_admin(Some(&someone)).await,
            Err(AppError::NotFound)
        ));

        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let enabled = service(db, Arc::new(NoOpMailer), &["Owner@b.co"]);
        assert!(matches!(
            enabled.bootstrap_admin(None).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            enabled.bootstrap_admin(Some(&someone)).await,
            Err(AppError::Forbidden("FORBIDDEN"))
        ));
    }

    #[tokio::test]
    async fn test_bootstrap_grants_role() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok()])
            .into_connection();
        let svc = service(db, Arc::new(NoOpMailer), &["owner@b.co"]);

        let owner = user("owner@b.co", "secret1");
        assert!(svc.bootstrap_admin(Some(&owner)).await.is_ok());
    }
}
