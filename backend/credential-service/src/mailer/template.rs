use super::url::{checked_base_url, confirmation_url, RedirectAllowList};
use super::{MailData, MailMessage, MailTransport, Mailer, ResolvedTemplate};
use crate::error::{CredentialError, Result};
use crate::models::{TemplateType, User};
use crate::validators;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use url::Url;

const DEFAULT_INVITE_MAIL: &str = r#"<h2>You have been invited</h2>

<p>You have been invited to create a user on {{ .SiteURL }}. Follow this link to accept the invite:</p>
<p><a href="{{ .ConfirmationURL }}">Accept the invite</a></p>"#;

const DEFAULT_CONFIRMATION_MAIL: &str = r#"<h2>Confirm your signup</h2>

<p>Follow this link to confirm your user:</p>
<p><a href="{{ .ConfirmationURL }}">Confirm your email address</a></p>"#;

const DEFAULT_RECOVERY_MAIL: &str = r#"<h2>Reset password</h2>

<p>Follow this link to reset the password for your user:</p>
<p><a href="{{ .ConfirmationURL }}">Reset password</a></p>"#;

const DEFAULT_EMAIL_CHANGE_MAIL: &str = r#"<h2>Confirm email address change</h2>

<p>Follow this link to confirm the update of your email address from {{ .Email }} to {{ .NewEmail }}:</p>
<p><a href="{{ .ConfirmationURL }}">Change email address</a></p>"#;

/// Built-in subject when neither the template nor configuration sets one
pub fn default_subject(kind: TemplateType) -> &'static str {
    match kind {
        TemplateType::Invite => "You have been invited",
        TemplateType::Confirmation => "Confirm Your Signup",
        TemplateType::Recovery => "Reset Your Password",
        TemplateType::EmailChange => "Confirm Email Change",
    }
}

fn default_body(kind: TemplateType) -> &'static str {
    match kind {
        TemplateType::Invite => DEFAULT_INVITE_MAIL,
        TemplateType::Confirmation => DEFAULT_CONFIRMATION_MAIL,
        TemplateType::Recovery => DEFAULT_RECOVERY_MAIL,
        TemplateType::EmailChange => DEFAULT_EMAIL_CHANGE_MAIL,
    }
}

/// Query parameter carrying the single-use token of each kind
fn token_param(kind: TemplateType) -> &'static str {
    match kind {
        TemplateType::Invite => "invite_token",
        TemplateType::Confirmation => "confirmation_token",
        TemplateType::Recovery => "recovery_token",
        TemplateType::EmailChange => "email_change_token",
    }
}

/// Body templates are always fetched from the site; absolute URLs keep only their path
fn enforce_relative_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(absolute) => match absolute.query() {
            Some(query) => format!("{}?{}", absolute.path(), query),
            None => absolute.path().to_string(),
        },
        Err(_) => url.to_string(),
    }
}

fn required<'a>(value: Option<&'a String>, what: &str) -> Result<&'a str> {
    value
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CredentialError::Validation(format!("user has no {what}")))
}

/// Mailer composing lifecycle mail from resolved templates
pub struct TemplateMailer {
    site_url: Url,
    allow_list: RedirectAllowList,
    transport: Arc<dyn MailTransport>,
}

impl TemplateMailer {
    /// The site host is always allowed as a referrer
    pub fn new(
        site_url: &str,
        allow_list: RedirectAllowList,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self> {
        let site_url = Url::parse(site_url)
            .map_err(|e| CredentialError::Internal(format!("Invalid site URL: {}", e)))?;

        Ok(Self {
            allow_list: allow_list.with_site(&site_url),
            site_url,
            transport,
        })
    }

    /// A template origin override must itself be an allow-listed host
    fn site_for(&self, template: &ResolvedTemplate) -> Result<Url> {
        match &template.base_url_override {
            Some(base) => checked_base_url(base, &self.allow_list),
            None => Ok(self.site_url.clone()),
        }
    }
}

fn site_string(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}

#[async_trait]
impl Mailer for TemplateMailer {
    fn validate_email(&self, email: &str) -> Result<()> {
        if validators::validate_email(email) {
            Ok(())
        } else {
            Err(CredentialError::Validation(format!(
                "invalid email format: {email}"
            )))
        }
    }

    async fn dispatch(
        &self,
        kind: TemplateType,
        user: &User,
        template: &ResolvedTemplate,
        referrer_url: Option<&str>,
    ) -> Result<()> {
        let (recipient, token) = match kind {
            TemplateType::Invite | TemplateType::Confirmation => (
                user.email.as_str(),
                required(user.confirmation_token.as_ref(), "confirmation token")?,
            ),
            TemplateType::Recovery => (
                user.email.as_str(),
                required(user.recovery_token.as_ref(), "recovery token")?,
            ),
            TemplateType::EmailChange => (
                required(user.email_change.as_ref(), "pending email change")?,
                required(user.email_change_token.as_ref(), "email change token")?,
            ),
        };

        let site_url = self.site_for(template)?;
        let url = confirmation_url(
            referrer_url,
            &site_url,
            &self.allow_list,
            &template.callback_path,
            token_param(kind),
            token,
        )?;

        let mut data = MailData::new();
        data.insert("SiteURL".into(), Value::String(site_string(&site_url)));
        data.insert("ConfirmationURL".into(), Value::String(url.to_string()));
        data.insert("Email".into(), Value::String(user.email.clone()));
        data.insert("Token".into(), Value::String(token.to_string()));
        data.insert("Data".into(), user.user_metadata.clone());
        if kind == TemplateType::EmailChange {
            data.insert("NewEmail".into(), json!(recipient));
        }

        let subject = if template.subject.is_empty() {
            default_subject(kind).to_string()
        } else {
            template.subject.clone()
        };

        self.transport
            .send(MailMessage {
                to: recipient.to_string(),
                subject,
                template_url: enforce_relative_url(&template.url_template),
                default_body: default_body(kind).to_string(),
                base_url: site_string(&site_url),
                data,
            })
            .await?;

        info!(kind = %kind, user_id = %user.id, "notification mail dispatched");
        Ok(())
    }

    async fn send_raw(
        &self,
        user: &User,
        subject: &str,
        body: &str,
        data: MailData,
    ) -> Result<()> {
        self.transport
            .send(MailMessage {
                to: user.email.clone(),
                subject: subject.to_string(),
                template_url: String::new(),
                default_body: body.to_string(),
                base_url: site_string(&self.site_url),
                data,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::transport::MockMailTransport;
    use uuid::Uuid;

    fn user() -> User {
        let mut user = User::new(Uuid::nil(), "app", "user@example.com");
        user.confirmation_token = Some("conf-123".to_string());
        user.recovery_token = Some("rec-456".to_string());
        user.user_metadata = json!({ "name": "Ada" });
        user
    }

    fn defaults() -> ResolvedTemplate {
        ResolvedTemplate::from_override(None, "", "")
    }

    fn mailer(transport: MockMailTransport) -> TemplateMailer {
        TemplateMailer::new(
            "https://app.example.com",
            RedirectAllowList::new(["*.partner.example"]),
            Arc::new(transport),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_recovery_mail_with_defaults() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|m| {
                m.to == "user@example.com"
                    && m.subject == "Reset Your Password"
                    && m.template_url.is_empty()
                    && m.default_body.contains("Reset password")
                    && m.base_url == "https://app.example.com"
                    && m.data["ConfirmationURL"]
                        == "https://app.example.com/?recovery_token=rec-456"
                    && m.data["SiteURL"] == "https://app.example.com"
                    && m.data["Token"] == "rec-456"
                    && m.data["Data"]["name"] == "Ada"
            })
            .times(1)
            .returning(|_| Ok(()));

        mailer(transport)
            .dispatch(TemplateType::Recovery, &user(), &defaults(), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unsafe_referrer_never_reaches_transport() {
        let mut transport = MockMailTransport::new();
        transport.expect_send().times(0);

        let err = mailer(transport)
            .dispatch(
                TemplateType::Invite,
                &user(),
                &defaults(),
                Some("https://attacker.example/landing"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::UnsafeRedirect(_)));
    }

    #[tokio::test]
    async fn test_allowed_referrer_and_overrides() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|m| {
                m.subject == "Join us"
                    && m.template_url == "/mail/invite.html"
                    && m.data["ConfirmationURL"]
                        == "https://eu.partner.example/welcome?invite_token=conf-123"
            })
            .times(1)
            .returning(|_| Ok(()));

        let template = ResolvedTemplate {
            subject: "Join us".to_string(),
            url_template: "https://elsewhere.example/mail/invite.html".to_string(),
            callback_path: "/welcome".to_string(),
            base_url_override: None,
        };
        mailer(transport)
            .dispatch(
                TemplateType::Invite,
                &user(),
                &template,
                Some("https://eu.partner.example/signup"),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_site_host_is_allowed_referrer() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|m| {
                m.data["ConfirmationURL"]
                    == "https://app.example.com/?confirmation_token=conf-123"
            })
            .times(1)
            .returning(|_| Ok(()));

        mailer(transport)
            .dispatch(
                TemplateType::Confirmation,
                &user(),
                &defaults(),
                Some("https://app.example.com/signup"),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_base_url_override() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|m| {
                m.base_url == "https://tenant.partner.example"
                    && m.data["SiteURL"] == "https://tenant.partner.example"
                    && m.data["ConfirmationURL"]
                        == "https://tenant.partner.example/?recovery_token=rec-456"
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut template = defaults();
        template.base_url_override = Some("https://tenant.partner.example".to_string());
        mailer(transport)
            .dispatch(TemplateType::Recovery, &user(), &template, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_base_url_override_outside_allow_list_is_refused() {
        let mut transport = MockMailTransport::new();
        transport.expect_send().times(0);

        let mut template = defaults();
        template.base_url_override = Some("https://attacker.example".to_string());
        let err = mailer(transport)
            .dispatch(TemplateType::Recovery, &user(), &template, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::UnsafeRedirect(_)));
    }

    #[tokio::test]
    async fn test_email_change_goes_to_new_address() {
        let mut user = user();
        user.email_change = Some("new@example.com".to_string());
        user.email_change_token = Some("chg-789".to_string());

        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|m| {
                m.to == "new@example.com"
                    && m.subject == "Confirm Email Change"
                    && m.data["NewEmail"] == "new@example.com"
                    && m.data["Email"] == "user@example.com"
                    && m.data["ConfirmationURL"]
                        == "https://app.example.com/?email_change_token=chg-789"
            })
            .times(1)
            .returning(|_| Ok(()));

        mailer(transport)
            .dispatch(TemplateType::EmailChange, &user, &defaults(), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        let mut transport = MockMailTransport::new();
        transport.expect_send().times(0);

        let mut user = user();
        user.recovery_token = None;
        let err = mailer(transport)
            .dispatch(TemplateType::Recovery, &user, &defaults(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Validation(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_is_returned() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Err(CredentialError::Transport("connection refused".into())));

        let err = mailer(transport)
            .dispatch(TemplateType::Recovery, &user(), &defaults(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Transport(_)));
    }

    #[tokio::test]
    async fn test_send_raw_skips_templates() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|m| {
                m.to == "user@example.com"
                    && m.subject == "Hello"
                    && m.template_url.is_empty()
                    && m.default_body == "<p>{{ .Note }}</p>"
                    && m.data["Note"] == "hi"
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut data = MailData::new();
        data.insert("Note".into(), json!("hi"));
        mailer(transport)
            .send_raw(&user(), "Hello", "<p>{{ .Note }}</p>", data)
            .await
            .unwrap();
    }

    #[test]
    fn test_validate_email() {
        let mailer = mailer(MockMailTransport::new());
        assert!(mailer.validate_email("user@example.com").is_ok());
        assert!(matches!(
            mailer.validate_email("not-an-email"),
            Err(CredentialError::Validation(_))
        ));
    }

    #[test]
    fn test_enforce_relative_url() {
        assert_eq!(enforce_relative_url("/mail/a.html"), "/mail/a.html");
        assert_eq!(
            enforce_relative_url("https://cdn.example/mail/a.html?v=2"),
            "/mail/a.html?v=2"
        );
        assert_eq!(enforce_relative_url(""), "");
    }
}
