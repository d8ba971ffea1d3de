//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Request hashing, CORS and admin bootstrap settings.
    pub security: SecurityConfig,
    /// Object storage configuration for poll images.
    pub storage: StorageConfig,
    /// Outgoing mail configuration. Mail is disabled when absent.
    #[serde(default)]
    pub mail: Option<MailConfig>,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of the site.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Salt mixed into every client IP and user agent hash.
    pub ip_hash_salt: String,
    /// Origins allowed by CORS. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Emails allowed to claim the admin role through the bootstrap endpoint.
    #[serde(default)]
    pub bootstrap_admin_emails: Vec<String>,
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the storage service, e.g. `https://xyz.example.co/storage/v1`.
    pub base_url: String,
    /// Bucket that receives poll preview images.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Secret used to sign upload tokens.
    pub signing_secret: String,
    /// Lifetime of a signed upload URL in seconds.
    #[serde(default = "default_upload_ttl")]
    pub upload_url_ttl_secs: u64,
}

/// SMTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// SMTP host.
    pub smtp_host: String,
    /// SMTP port. Port 465 uses implicit TLS, anything else STARTTLS.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username, also used as the sender address.
    pub username: String,
    /// SMTP password.
    pub password: String,
    /// Addresses notified about new registrations.
    #[serde(default)]
    pub admin_recipients: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_bucket() -> String {
    "poll-images".to_string()
}

const fn default_upload_ttl() -> u64 {
    7200
}

const fn default_smtp_port() -> u16 {
    587
}

fn default_log_filter() -> String {
    "askanai=info,tower_http=info".to_string()
}

const LIST_KEYS: [&str; 3] = [
    "security.allowed_origins",
    "security.bootstrap_admin_emails",
    "mail.admin_recipients",
];

fn env_source() -> config::Environment {
    let mut env = config::Environment::with_prefix("ASKANAI")
        .prefix_separator("__")
        .separator("__")
        .list_separator(",")
        .try_parsing(true);
    for key in LIST_KEYS {
        env = env.with_list_parse_key(key);
    }
    env
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `ASKANAI_ENV`)
    /// 4. Environment variables with `ASKANAI__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("ASKANAI_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(env_source())
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        config.try_deserialize()
    }

    /// Whether `email` may claim the admin role. Comparison is case-insensitive.
    #[must_use]
    pub fn is_bootstrap_admin(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        !email.is_empty()
            && self
                .security
                .bootstrap_admin_emails
                .iter()
                .any(|allowed| allowed.trim().to_lowercase() == email)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    const MINIMAL: &str = r#"
        [server]
        url = "https://askanai.example"

        [database]
        url = "postgres://localhost/askanai"

        [security]
        ip_hash_salt = "pepper"

        [storage]
        base_url = "https://storage.example/storage/v1"
        signing_secret = "s3cret"
    "#;

    #[test]
    fn test_defaults_applied() {
        let config = parse(MINIMAL);

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.bucket, "poll-images");
        assert_eq!(config.storage.upload_url_ttl_secs, 7200);
        assert!(config.security.allowed_origins.is_empty());
        assert!(config.mail.is_none());
        assert!(!config.log.json);
    }

    #[test]
    fn test_bootstrap_admin_match_is_case_insensitive() {
        let mut config = parse(MINIMAL);
        config.security.bootstrap_admin_emails = vec![" Owner@Example.com ".to_string()];

        assert!(config.is_bootstrap_admin("owner@example.com"));
        assert!(config.is_bootstrap_admin("OWNER@EXAMPLE.COM"));
        assert!(!config.is_bootstrap_admin("other@example.com"));
        assert!(!config.is_bootstrap_admin(""));
    }

    #[test]
    fn test_missing_salt_is_rejected() {
        let toml = MINIMAL.replace("ip_hash_salt = \"pepper\"", "");
        let result: Result<Config, _> = config::Config::builder()
            .add_source(config::File::from_str(&toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize();

        assert!(result.is_err());
    }
}
