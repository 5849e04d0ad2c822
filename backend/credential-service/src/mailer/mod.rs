/// Notification mail for account lifecycle events
///
/// - **resolver**: per-audience template overrides with field-by-field defaults
/// - **url**: callback URL composition with referrer allow-listing
/// - **render**: `{{ .Key }}` placeholder substitution
/// - **transport**: SMTP delivery (lettre)
/// - [`TemplateMailer`] / [`NoopMailer`]: the two [`Mailer`] implementations
pub mod noop;
pub mod render;
pub mod resolver;
pub mod template;
pub mod transport;
pub mod url;

pub use noop::NoopMailer;
pub use resolver::{resolve, ResolvedTemplate};
pub use template::TemplateMailer;
pub use transport::{MailMessage, MailTransport, SmtpTransport};
pub use url::RedirectAllowList;

use crate::error::Result;
use crate::models::{TemplateType, User};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Template data handed to the transport
pub type MailData = Map<String, Value>;

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Syntax-only check of an address; no network access
    fn validate_email(&self, email: &str) -> Result<()>;

    /// Send the lifecycle mail of `kind` to `user`
    async fn dispatch(
        &self,
        kind: TemplateType,
        user: &User,
        template: &ResolvedTemplate,
        referrer_url: Option<&str>,
    ) -> Result<()>;

    /// Send a one-off message without template resolution or URL building
    async fn send_raw(&self, user: &User, subject: &str, body: &str, data: MailData)
        -> Result<()>;
}
