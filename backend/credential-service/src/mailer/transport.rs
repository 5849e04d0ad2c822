/// Outbound mail delivery
use super::render::render;
use super::MailData;
use crate::config::MailerSettings;
use crate::error::{CredentialError, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// A fully composed message awaiting body rendering and delivery
#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    /// Body template path relative to `base_url`; empty uses `default_body`
    pub template_url: String,
    pub default_body: String,
    pub base_url: String,
    pub data: MailData,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<()>;
}

/// SMTP delivery with body templates fetched from the site
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    http: reqwest::Client,
}

impl SmtpTransport {
    pub fn new(config: &MailerSettings) -> Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| CredentialError::Internal(format!("Invalid SMTP_FROM address: {}", e)))?;

        let timeout = Duration::from_secs(config.send_timeout);
        let builder = if config.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        }
        .map_err(|e| CredentialError::Internal(format!("Failed to configure SMTP transport: {}", e)))?
        .port(config.smtp_port)
        .timeout(Some(timeout));

        let builder = if let (Some(username), Some(password)) =
            (&config.smtp_username, &config.smtp_password)
        {
            builder.credentials(Credentials::new(username.to_string(), password.to_string()))
        } else {
            builder
        };

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CredentialError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            transport: builder.build(),
            from,
            http,
        })
    }

    /// Fetch the body template, falling back to the built-in default
    async fn load_body(&self, message: &MailMessage) -> String {
        if message.template_url.is_empty() {
            return message.default_body.clone();
        }

        let url = match Url::parse(&message.base_url).and_then(|b| b.join(&message.template_url)) {
            Ok(url) => url,
            Err(e) => {
                warn!(template_url = %message.template_url, error = %e, "invalid mail template URL; using default body");
                return message.default_body.clone();
            }
        };

        let response = match self.http.get(url.clone()).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(%url, status = %response.status(), "mail template fetch failed; using default body");
                return message.default_body.clone();
            }
            Err(e) => {
                warn!(%url, error = %e, "mail template fetch failed; using default body");
                return message.default_body.clone();
            }
        };

        match response.text().await {
            Ok(body) if !body.trim().is_empty() => body,
            Ok(_) => message.default_body.clone(),
            Err(e) => {
                warn!(%url, error = %e, "mail template read failed; using default body");
                message.default_body.clone()
            }
        }
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, message: MailMessage) -> Result<()> {
        let to = message.to.parse::<Mailbox>().map_err(|e| {
            CredentialError::Validation(format!("Invalid recipient email address: {}", e))
        })?;

        let body = render(&self.load_body(&message).await, &message.data);
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.as_str())
            .header(header::ContentType::TEXT_HTML)
            .body(body)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| CredentialError::Transport(format!("Failed to send email: {}", e)))?;
        info!(subject = %message.subject, "email sent successfully");

        Ok(())
    }
}
