use super::{MailData, Mailer, ResolvedTemplate};
use crate::error::Result;
use crate::models::{TemplateType, User};
use async_trait::async_trait;
use tracing::debug;

/// Mailer used when no SMTP relay is configured; accepts and drops every message
#[derive(Debug, Clone, Default)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    fn validate_email(&self, _email: &str) -> Result<()> {
        Ok(())
    }

    async fn dispatch(
        &self,
        kind: TemplateType,
        user: &User,
        _template: &ResolvedTemplate,
        _referrer_url: Option<&str>,
    ) -> Result<()> {
        debug!(kind = %kind, user_id = %user.id, "mailer disabled; dropping notification");
        Ok(())
    }

    async fn send_raw(
        &self,
        user: &User,
        subject: &str,
        _body: &str,
        _data: MailData,
    ) -> Result<()> {
        debug!(user_id = %user.id, subject, "mailer disabled; dropping message");
        Ok(())
    }
}
