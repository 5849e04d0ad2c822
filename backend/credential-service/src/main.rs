/// Credential Service Main Entry Point
///
/// Starts the HTTP API with:
/// - PostgreSQL connection pool (optionally namespaced tables)
/// - Notification mailer (SMTP, or no-op when SMTP is not configured)
use anyhow::{Context, Result};
use credential_service::{
    config::Settings,
    db::PgStore,
    http::{start_http_server, AppState},
    mailer::{Mailer, NoopMailer, RedirectAllowList, SmtpTransport, TemplateMailer},
    security::AccessGate,
    services::NotificationService,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "credential_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Credential Service");

    // Load configuration
    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .acquire_timeout(Duration::from_secs(settings.database.acquire_timeout))
        .connect(&settings.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!(
        "Database pool initialized with {} max connections",
        settings.database.max_connections
    );

    let store = PgStore::new(db_pool, settings.database.namespace.as_deref())
        .context("Invalid database namespace")?;

    if settings.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(store.pool())
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations completed");
    }

    let site_url = url::Url::parse(&settings.mailer.site_url).context("Invalid SITE_URL")?;
    let redirect_allow_list =
        RedirectAllowList::new(&settings.mailer.redirect_allow_list).with_site(&site_url);

    // Initialize mailer
    let mailer: Arc<dyn Mailer> = if settings.mailer.smtp_enabled() {
        let transport = SmtpTransport::new(&settings.mailer)
            .context("Failed to initialize SMTP transport")?;
        let mailer = TemplateMailer::new(
            &settings.mailer.site_url,
            redirect_allow_list.clone(),
            Arc::new(transport),
        )
        .context("Failed to initialize mailer")?;
        info!("Mailer initialized with SMTP");
        Arc::new(mailer)
    } else {
        info!("Mailer running in no-op mode (SMTP not configured)");
        Arc::new(NoopMailer)
    };

    let state = AppState {
        store: Arc::new(store),
        gate: AccessGate::new(&settings.jwt.secret, &settings.jwt.default_audience)
            .with_admin_roles(settings.jwt.admin_roles.clone()),
        redirect_allow_list,
        instance_id: settings.instance_id,
        cookie_name: settings.jwt.cookie_name.clone(),
        notifications: NotificationService::new(
            mailer,
            settings.mailer.subjects.clone(),
            settings.mailer.templates.clone(),
        ),
    };

    start_http_server(
        state,
        &settings.server.host,
        settings.server.port,
        Duration::from_secs(settings.server.request_timeout),
        shutdown_signal(),
    )
    .await
    .context("HTTP server error")?;

    info!("Credential service shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
