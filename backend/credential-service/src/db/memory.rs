/// In-process implementation of the store traits.
///
/// Used by tests and local tooling. A transaction works on its own view of the
/// data and records every write as an operation; `commit` replays those
/// operations against the current shared state under one lock, so two
/// transactions writing different identity columns never clobber each other.
/// Dropping a transaction discards its operations.
use super::{DataStore, StoreTx};
use crate::error::{CredentialError, Result};
use crate::models::{
    AuditLogEntry, Identity, IdentityColumn, IdentityLookup, RefreshToken, Template,
    TemplateType, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    Begin,
    InsertIdentity,
    FindIdentity,
    UpdateIdentity,
    FindUser,
    SetRecoveryToken,
    FindTemplate,
    ReplaceTemplate,
    InsertAudit,
    RevokeRefreshTokens,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct State {
    users: HashMap<Uuid, User>,
    identities: Vec<Identity>,
    templates: Vec<Template>,
    refresh_tokens: Vec<RefreshToken>,
    audit_log: Vec<AuditLogEntry>,
}

#[derive(Debug, Clone)]
enum Op {
    InsertIdentity(Identity),
    UpdateIdentity {
        id: Uuid,
        column: IdentityColumn,
        value: Option<String>,
    },
    SetRecoveryToken {
        user_id: Uuid,
        token: String,
        sent_at: DateTime<Utc>,
    },
    ReplaceTemplate(Template),
    InsertAudit(AuditLogEntry),
    RevokeRefreshTokens {
        instance_id: Uuid,
        user_id: Uuid,
    },
}

fn unique_violation(constraint: &str) -> CredentialError {
    CredentialError::Database(format!(
        "duplicate key value violates unique constraint \"{constraint}\""
    ))
}

impl State {
    fn apply(&mut self, op: &Op) -> Result<u64> {
        match op {
            Op::InsertIdentity(identity) => {
                for existing in &self.identities {
                    if existing.id == identity.id {
                        return Err(unique_violation("identities_pkey"));
                    }
                    if existing.user_id == identity.user_id {
                        return Err(unique_violation("identities_user_id_key"));
                    }
                    if existing.access_key == identity.access_key {
                        return Err(unique_violation("identities_access_key_key"));
                    }
                    if existing.secret_key == identity.secret_key {
                        return Err(unique_violation("identities_secret_key_key"));
                    }
                }
                self.identities.push(identity.clone());
                Ok(1)
            }
            Op::UpdateIdentity { id, column, value } => {
                let collides = |other: &Identity| match column {
                    IdentityColumn::AccessKey => value.as_deref() == Some(&other.access_key),
                    IdentityColumn::SecretKey => value.as_deref() == Some(&other.secret_key),
                    IdentityColumn::SessionToken => {
                        value.is_some() && other.session_token == *value
                    }
                };
                if self
                    .identities
                    .iter()
                    .any(|other| other.id != *id && collides(other))
                {
                    return Err(unique_violation(match column {
                        IdentityColumn::AccessKey => "identities_access_key_key",
                        IdentityColumn::SecretKey => "identities_secret_key_key",
                        IdentityColumn::SessionToken => "identities_user_token_key",
                    }));
                }

                let Some(identity) = self.identities.iter_mut().find(|i| i.id == *id) else {
                    return Ok(0);
                };
                match column {
                    IdentityColumn::AccessKey => {
                        identity.access_key = value.clone().unwrap_or_default()
                    }
                    IdentityColumn::SecretKey => {
                        identity.secret_key = value.clone().unwrap_or_default()
                    }
                    IdentityColumn::SessionToken => identity.session_token = value.clone(),
                }
                Ok(1)
            }
            Op::SetRecoveryToken {
                user_id,
                token,
                sent_at,
            } => match self.users.get_mut(user_id) {
                Some(user) => {
                    user.recovery_token = Some(token.clone());
                    user.recovery_sent_at = Some(*sent_at);
                    Ok(1)
                }
                None => Ok(0),
            },
            Op::ReplaceTemplate(template) => {
                self.templates
                    .retain(|t| !(t.aud == template.aud && t.kind == template.kind));
                self.templates.push(template.clone());
                Ok(1)
            }
            Op::InsertAudit(entry) => {
                self.audit_log.push(entry.clone());
                Ok(1)
            }
            Op::RevokeRefreshTokens {
                instance_id,
                user_id,
            } => {
                let before = self.refresh_tokens.len();
                self.refresh_tokens
                    .retain(|t| !(t.instance_id == *instance_id && t.user_id == *user_id));
                Ok((before - self.refresh_tokens.len()) as u64)
            }
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: State,
    faults: HashSet<FaultPoint>,
    next_refresh_token_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent call reaching `point` fail with a store error
    pub fn inject_fault(&self, point: FaultPoint) {
        self.lock().faults.insert(point);
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    pub fn insert_user(&self, user: User) {
        self.lock().state.users.insert(user.id, user);
    }

    pub fn user(&self, user_id: Uuid) -> Option<User> {
        self.lock().state.users.get(&user_id).cloned()
    }

    pub fn issue_refresh_token(&self, instance_id: Uuid, user_id: Uuid) -> RefreshToken {
        let mut inner = self.lock();
        inner.next_refresh_token_id += 1;
        let token = RefreshToken {
            id: inner.next_refresh_token_id,
            instance_id,
            user_id,
            token: Uuid::new_v4().simple().to_string(),
            created_at: Utc::now(),
        };
        inner.state.refresh_tokens.push(token.clone());
        token
    }

    pub fn refresh_tokens_for(&self, user_id: Uuid) -> Vec<RefreshToken> {
        self.lock()
            .state
            .refresh_tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn identity_for_user(&self, user_id: Uuid) -> Option<Identity> {
        self.lock()
            .state
            .identities
            .iter()
            .find(|i| i.user_id == user_id)
            .cloned()
    }

    pub fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.lock().state.audit_log.clone()
    }

    pub fn templates(&self) -> Vec<Template> {
        self.lock().state.templates.clone()
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        let inner = self.lock();
        if inner.faults.contains(&FaultPoint::Begin) {
            return Err(injected(FaultPoint::Begin));
        }
        Ok(MemoryTx {
            store: self.clone(),
            view: inner.state.clone(),
            ops: Vec::new(),
        })
    }
}

fn injected(point: FaultPoint) -> CredentialError {
    CredentialError::Database(format!("injected fault at {point:?}"))
}

pub struct MemoryTx {
    store: MemoryStore,
    view: State,
    ops: Vec<Op>,
}

impl MemoryTx {
    fn check(&self, point: FaultPoint) -> Result<()> {
        if self.store.lock().faults.contains(&point) {
            return Err(injected(point));
        }
        Ok(())
    }

    fn record(&mut self, op: Op) -> Result<u64> {
        let affected = self.view.apply(&op)?;
        self.ops.push(op);
        Ok(affected)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_identity(&mut self, identity: &Identity) -> Result<()> {
        self.check(FaultPoint::InsertIdentity)?;
        self.record(Op::InsertIdentity(identity.clone()))?;
        Ok(())
    }

    async fn find_identity(&mut self, lookup: IdentityLookup<'_>) -> Result<Option<Identity>> {
        self.check(FaultPoint::FindIdentity)?;
        Ok(self
            .view
            .identities
            .iter()
            .find(|identity| lookup.matches(identity))
            .cloned())
    }

    async fn update_identity_column(
        &mut self,
        identity_id: Uuid,
        column: IdentityColumn,
        value: Option<&str>,
    ) -> Result<()> {
        self.check(FaultPoint::UpdateIdentity)?;
        self.record(Op::UpdateIdentity {
            id: identity_id,
            column,
            value: value.map(str::to_string),
        })?;
        Ok(())
    }

    async fn find_user(&mut self, user_id: Uuid) -> Result<Option<User>> {
        self.check(FaultPoint::FindUser)?;
        Ok(self.view.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(
        &mut self,
        instance_id: Uuid,
        aud: &str,
        email: &str,
    ) -> Result<Option<User>> {
        self.check(FaultPoint::FindUser)?;
        Ok(self
            .view
            .users
            .values()
            .find(|u| {
                u.instance_id == instance_id && u.aud == aud && u.email.eq_ignore_ascii_case(email)
            })
            .cloned())
    }

    async fn set_recovery_token(
        &mut self,
        user_id: Uuid,
        token: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check(FaultPoint::SetRecoveryToken)?;
        self.record(Op::SetRecoveryToken {
            user_id,
            token: token.to_string(),
            sent_at,
        })?;
        Ok(())
    }

    async fn find_template(&mut self, aud: &str, kind: TemplateType) -> Result<Option<Template>> {
        self.check(FaultPoint::FindTemplate)?;
        Ok(self
            .view
            .templates
            .iter()
            .find(|t| t.aud == aud && t.kind == kind)
            .cloned())
    }

    async fn replace_template(&mut self, template: &Template) -> Result<()> {
        self.check(FaultPoint::ReplaceTemplate)?;
        self.record(Op::ReplaceTemplate(template.clone()))?;
        Ok(())
    }

    async fn insert_audit_entry(&mut self, entry: &AuditLogEntry) -> Result<()> {
        self.check(FaultPoint::InsertAudit)?;
        self.record(Op::InsertAudit(entry.clone()))?;
        Ok(())
    }

    async fn revoke_refresh_tokens(&mut self, instance_id: Uuid, user_id: Uuid) -> Result<u64> {
        self.check(FaultPoint::RevokeRefreshTokens)?;
        self.record(Op::RevokeRefreshTokens {
            instance_id,
            user_id,
        })
    }

    async fn commit(self) -> Result<()> {
        self.check(FaultPoint::Commit)?;

        let mut inner = self.store.lock();
        let mut next = inner.state.clone();
        for op in &self.ops {
            next.apply(op)?;
        }
        inner.state = next;
        Ok(())
    }
}
