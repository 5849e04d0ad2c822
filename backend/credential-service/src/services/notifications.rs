use crate::config::PerKind;
use crate::db::{DataStore, StoreTx};
use crate::error::Result;
use crate::mailer::{resolve, template::default_subject, Mailer};
use crate::models::{AuditAction, AuditLogEntry, TemplateType, User};
use crate::security::secure_token;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Account lifecycle mail: resolves the per-audience template and hands it to the mailer
pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
    subjects: PerKind,
    templates: PerKind,
}

impl NotificationService {
    /// `subjects` and `templates` are the configured defaults used when no override exists
    pub fn new(mailer: Arc<dyn Mailer>, subjects: PerKind, templates: PerKind) -> Self {
        Self {
            mailer,
            subjects,
            templates,
        }
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    fn default_subject(&self, kind: TemplateType) -> &str {
        match self.subjects.get(kind) {
            "" => default_subject(kind),
            configured => configured,
        }
    }

    /// Send the `kind` mail to `user` using the templates of `audience`
    pub async fn notify(
        &self,
        tx: &mut impl StoreTx,
        audience: &str,
        kind: TemplateType,
        user: &User,
        referrer: Option<&str>,
    ) -> Result<()> {
        self.mailer.validate_email(&user.email)?;
        if let (TemplateType::EmailChange, Some(new_email)) = (kind, user.email_change.as_deref())
        {
            self.mailer.validate_email(new_email)?;
        }

        let template = resolve(
            tx,
            audience,
            kind,
            self.default_subject(kind),
            self.templates.get(kind),
        )
        .await?;
        self.mailer.dispatch(kind, user, &template, referrer).await
    }

    /// Start password recovery for `email`.
    ///
    /// Returns `false` without sending anything when no such user exists. The
    /// recovery token, audit entry and mail succeed or fail together.
    pub async fn request_recovery<S: DataStore>(
        &self,
        store: &S,
        instance_id: Uuid,
        audience: &str,
        email: &str,
        referrer: Option<&str>,
    ) -> Result<bool> {
        self.mailer.validate_email(email)?;

        let mut tx = store.begin().await?;
        let Some(mut user) = tx.find_user_by_email(instance_id, audience, email).await? else {
            info!(audience, "recovery requested for unknown email");
            return Ok(false);
        };

        let token = secure_token()?;
        let sent_at = Utc::now();
        tx.set_recovery_token(user.id, &token, sent_at).await?;
        user.recovery_token = Some(token);
        user.recovery_sent_at = Some(sent_at);

        let entry = AuditLogEntry::new(instance_id, &user, AuditAction::UserRecoveryRequested, None);
        tx.insert_audit_entry(&entry).await?;

        self.notify(&mut tx, audience, TemplateType::Recovery, &user, referrer)
            .await?;
        tx.commit().await?;

        info!(user_id = %user.id, "recovery mail sent");
        Ok(true)
    }
}
