//! Configuration management for the credential service
//!
//! Loads settings from environment variables, with a `.env` file honoured
//! in debug builds.
//!
//! # Example
//!
//! ```no_run
//! use credential_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("site: {}", settings.mailer.site_url);
//!     Ok(())
//! }
//! ```

use crate::models::TemplateType;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::info;
use uuid::Uuid;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub server: ServerSettings,
    pub jwt: JwtSettings,
    pub mailer: MailerSettings,
    /// Instance scope threaded through audit entries and token revocation
    pub instance_id: Uuid,
}

impl Settings {
    pub fn load() -> Result<Self> {
        // Load .env file in development
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
            info!("Loaded .env file for development");
        }

        Ok(Settings {
            database: DatabaseSettings::from_env()?,
            server: ServerSettings::from_env()?,
            jwt: JwtSettings::from_env()?,
            mailer: MailerSettings::from_env()?,
            instance_id: env::var("INSTANCE_ID")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| Uuid::parse_str(v.trim()))
                .transpose()
                .context("Invalid INSTANCE_ID")?
                .unwrap_or_else(Uuid::nil),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("Invalid {name}"))
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: u64,
    /// Schema prefix for every table
    pub namespace: Option<String>,
    pub run_migrations: bool,
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "20")?,
            acquire_timeout: parse_var("DATABASE_ACQUIRE_TIMEOUT", "5")?,
            namespace: optional_var("DATABASE_NAMESPACE"),
            run_migrations: parse_var("DATABASE_RUN_MIGRATIONS", "true")?,
        })
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Inbound request deadline in seconds
    pub request_timeout: u64,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("SERVER_PORT", "8081")?,
            request_timeout: parse_var("SERVER_REQUEST_TIMEOUT", "30")?,
        })
    }
}

/// Bearer token verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtSettings {
    pub secret: String,
    pub default_audience: String,
    /// Cookie carrying the session JWT, cleared on logout
    pub cookie_name: Option<String>,
    /// Token roles allowed on administrative endpoints
    pub admin_roles: Vec<String>,
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            default_audience: env::var("JWT_DEFAULT_AUDIENCE")
                .unwrap_or_else(|_| "authenticated".to_string()),
            cookie_name: optional_var("JWT_COOKIE_NAME"),
            admin_roles: env::var("JWT_ADMIN_ROLES")
                .unwrap_or_else(|_| "admin".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }
}

/// One optional value per notification kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerKind {
    pub invite: Option<String>,
    pub confirmation: Option<String>,
    pub recovery: Option<String>,
    pub email_change: Option<String>,
}

impl PerKind {
    fn from_env(prefix: &str) -> Self {
        Self {
            invite: optional_var(&format!("{prefix}_INVITE")),
            confirmation: optional_var(&format!("{prefix}_CONFIRMATION")),
            recovery: optional_var(&format!("{prefix}_RECOVERY")),
            email_change: optional_var(&format!("{prefix}_EMAIL_CHANGE")),
        }
    }

    pub fn get(&self, kind: TemplateType) -> &str {
        let value = match kind {
            TemplateType::Invite => &self.invite,
            TemplateType::Confirmation => &self.confirmation,
            TemplateType::Recovery => &self.recovery,
            TemplateType::EmailChange => &self.email_change,
        };
        value.as_deref().unwrap_or_default()
    }
}

/// Notification mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerSettings {
    pub site_url: String,
    /// Hosts a referrer may point to; `*.example.com` matches subdomains
    pub redirect_allow_list: Vec<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub use_starttls: bool,
    /// Seconds allowed for template fetch and SMTP delivery each
    pub send_timeout: u64,
    pub subjects: PerKind,
    pub templates: PerKind,
}

impl MailerSettings {
    fn from_env() -> Result<Self> {
        let site_url = env::var("SITE_URL").context("SITE_URL must be set")?;
        let parsed = url::Url::parse(&site_url).context("Invalid SITE_URL")?;
        if parsed.host_str().is_none() {
            bail!("SITE_URL must be an absolute URL with a host");
        }

        Ok(Self {
            site_url,
            redirect_allow_list: env::var("MAILER_REDIRECT_ALLOW_LIST")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            smtp_host: env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: parse_var("SMTP_PORT", "587")?,
            smtp_username: optional_var("SMTP_USERNAME"),
            smtp_password: optional_var("SMTP_PASSWORD"),
            smtp_from: env::var("SMTP_FROM").unwrap_or_else(|_| "noreply@localhost".to_string()),
            use_starttls: env::var("SMTP_USE_STARTTLS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            send_timeout: parse_var("MAILER_SEND_TIMEOUT", "10")?,
            subjects: PerKind::from_env("MAILER_SUBJECTS"),
            templates: PerKind::from_env("MAILER_TEMPLATES"),
        })
    }

    pub fn smtp_enabled(&self) -> bool {
        !self.smtp_host.trim().is_empty()
    }
}
