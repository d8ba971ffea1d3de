//! askanai server entry point.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, bail};
use askanai_api::{AppState, app};
use askanai_common::{Config, config::LogConfig};
use askanai_core::{MailerService, NoOpMailer, SmtpMailer};
use axum::Router;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if log.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_mailer(config: &Config) -> anyhow::Result<MailerService> {
    match &config.mail {
        Some(mail) => {
            let mailer = SmtpMailer::new(mail).context("Invalid mail configuration")?;
            info!(host = %mail.smtp_host, port = mail.smtp_port, "SMTP mailer enabled");
            Ok(Arc::new(mailer))
        }
        None => {
            warn!("Mail is not configured; account emails are disabled");
            Ok(Arc::new(NoOpMailer))
        }
    }
}

/// Tracing, body size limit and request timeout, outermost first.
fn with_transport_layers(app: Router) -> Router {
    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    init_tracing(&config.log);

    info!("Starting askanai server...");

    if config.security.ip_hash_salt.trim().is_empty() {
        bail!("security.ip_hash_salt must be set");
    }

    let db = askanai_db::init(&config)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    let mailer = build_mailer(&config)?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host or server.port")?;

    let state = AppState::new(Arc::new(db), Arc::new(config), mailer);
    let app = with_transport_layers(app(state));

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}
