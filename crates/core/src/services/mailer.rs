//! Outgoing mail.
//!
//! Services depend on the [`Mailer`] trait so that mail can be disabled or
//! replaced in tests.

use async_trait::async_trait;
use askanai_common::{AppError, AppResult, config::MailConfig};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::sync::Arc;
use tracing::info;

/// Trait for sending account notifications.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Notify a new user, and the configured admins, that an account was
    /// created. Returns whether any mail was handed to the transport.
    async fn send_account_created(&self, user_email: &str) -> AppResult<bool>;
}

/// Shared mailer handle.
pub type MailerService = Arc<dyn Mailer>;

/// A mailer that sends nothing, used when SMTP is not configured.
#[derive(Clone, Default)]
pub struct NoOpMailer;

#[async_trait]
impl Mailer for NoOpMailer {
    async fn send_account_created(&self, _user_email: &str) -> AppResult<bool> {
        Ok(false)
    }
}

/// SMTP mailer. Port 465 uses implicit TLS, other ports STARTTLS.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    admin_recipients: Vec<Mailbox>,
}

fn parse_mailbox(address: &str) -> AppResult<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid mail address {address:?}: {e}")))
}

impl SmtpMailer {
    /// Build an SMTP mailer from configuration.
    pub fn new(config: &MailConfig) -> AppResult<Self> {
        let builder = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        }
        .map_err(|e| AppError::Config(format!("Invalid SMTP host: {e}")))?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let admin_recipients = config
            .admin_recipients
            .iter()
            .filter(|r| !r.trim().is_empty())
            .map(|r| parse_mailbox(r))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            transport,
            from: parse_mailbox(&config.username)?,
            admin_recipients,
        })
    }

    async fn send(&self, message: Message) -> AppResult<()> {
        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::ExternalService(format!("SMTP send failed: {e}")))?;
        Ok(())
    }
}

fn user_notice(user_email: &str) -> String {
    format!(
        "Your AskAnAI account has been created.\n\n\
         Email: {user_email}\n\n\
         You can now sign in with the password you chose at registration."
    )
}

fn admin_notice(user_email: &str, at: chrono::DateTime<chrono::Utc>) -> String {
    format!(
        "A new account was created.\n\n\
         User email: {user_email}\n\
         Created at (UTC): {}",
        at.to_rfc3339()
    )
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_account_created(&self, user_email: &str) -> AppResult<bool> {
        let to = parse_mailbox(user_email)?;

        let user_message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Your AskAnAI account has been created")
            .header(ContentType::TEXT_PLAIN)
            .body(user_notice(user_email))
            .map_err(|e| AppError::Internal(format!("Failed to build email: {e}")))?;
        self.send(user_message).await?;

        if !self.admin_recipients.is_empty() {
            let mut builder = Message::builder()
                .from(self.from.clone())
                .subject("AskAnAI new user registration")
                .header(ContentType::TEXT_PLAIN);
            for recipient in &self.admin_recipients {
                builder = builder.to(recipient.clone());
            }
            let admin_message = builder
                .body(admin_notice(user_email, chrono::Utc::now()))
                .map_err(|e| AppError::Internal(format!("Failed to build email: {e}")))?;
            self.send(admin_message).await?;
        }

        info!(recipients = self.admin_recipients.len() + 1, "Account emails sent");
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_mailer_reports_not_sent() {
        let mailer: MailerService = Arc::new(NoOpMailer);
        assert!(!mailer.send_account_created("a@b.co").await.unwrap());
    }

    #[test]
    fn test_user_notice_never_contains_secrets() {
        let text = user_notice("a@b.co");
        assert!(text.contains("a@b.co"));
        assert!(!text.to_lowercase().contains("password:"));
    }

    #[tokio::test]
    async fn test_smtp_mailer_rejects_bad_sender() {
        let config = MailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            username: "not an address".to_string(),
            password: "x".to_string(),
            admin_recipients: vec![],
        };
        assert!(matches!(SmtpMailer::new(&config), Err(AppError::Config(_))));
    }
}
