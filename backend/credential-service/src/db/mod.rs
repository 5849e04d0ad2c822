/// Database operations for the credential service
///
/// The core never opens ambient transactions: every operation receives an
/// explicit [`StoreTx`] obtained from a [`DataStore`]. A transaction that is
/// dropped without [`StoreTx::commit`] is rolled back, which also covers
/// cancelled or timed-out requests.
pub mod identities;
pub mod memory;
pub mod postgres;
pub mod templates;

use crate::error::{CredentialError, Result};
use crate::models::{
    AuditLogEntry, Identity, IdentityColumn, IdentityLookup, Template, TemplateType, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

pub use memory::{FaultPoint, MemoryStore};
pub use postgres::PgStore;

/// Source of transactions
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    type Tx: StoreTx;

    async fn begin(&self) -> Result<Self::Tx>;
}

/// Row-level primitives available inside one unit of work
#[async_trait]
pub trait StoreTx: Send {
    async fn insert_identity(&mut self, identity: &Identity) -> Result<()>;

    async fn find_identity(&mut self, lookup: IdentityLookup<'_>) -> Result<Option<Identity>>;

    /// Write a single identity column; other columns of the row are untouched.
    async fn update_identity_column(
        &mut self,
        identity_id: Uuid,
        column: IdentityColumn,
        value: Option<&str>,
    ) -> Result<()>;

    async fn find_user(&mut self, user_id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_email(
        &mut self,
        instance_id: Uuid,
        aud: &str,
        email: &str,
    ) -> Result<Option<User>>;

    async fn set_recovery_token(
        &mut self,
        user_id: Uuid,
        token: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn find_template(&mut self, aud: &str, kind: TemplateType) -> Result<Option<Template>>;

    /// Insert a template, removing any previous row for the same `(aud, type)`.
    async fn replace_template(&mut self, template: &Template) -> Result<()>;

    async fn insert_audit_entry(&mut self, entry: &AuditLogEntry) -> Result<()>;

    /// Revoke every refresh token of `user_id` within `instance_id`.
    async fn revoke_refresh_tokens(&mut self, instance_id: Uuid, user_id: Uuid) -> Result<u64>;

    async fn commit(self) -> Result<()>;
}

static NAMESPACE_REGEX: Lazy<Regex> = Lazy::new(|| {
    // This regex is hardcoded and validated - it is a compile-time constant in practice
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$")
        .expect("hardcoded namespace regex is invalid - fix source code")
});

/// Fully qualified table names, optionally prefixed by a namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub users: String,
    pub identities: String,
    pub templates: String,
    pub refresh_tokens: String,
    pub audit_log_entries: String,
}

impl TableNames {
    pub fn new(namespace: Option<&str>) -> Result<Self> {
        let prefix = match namespace.map(str::trim).filter(|ns| !ns.is_empty()) {
            Some(ns) if NAMESPACE_REGEX.is_match(ns) => format!("{ns}."),
            Some(ns) => {
                return Err(CredentialError::Validation(format!(
                    "invalid table namespace: {ns}"
                )))
            }
            None => String::new(),
        };

        Ok(Self {
            users: format!("{prefix}users"),
            identities: format!("{prefix}identities"),
            templates: format!("{prefix}templates"),
            refresh_tokens: format!("{prefix}refresh_tokens"),
            audit_log_entries: format!("{prefix}audit_log_entries"),
        })
    }
}
