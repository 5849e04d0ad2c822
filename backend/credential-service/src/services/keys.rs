use crate::db::{identities, DataStore, StoreTx};
use crate::error::Result;
use crate::models::{AuditAction, AuditLogEntry, Identity, User};
use serde_json::json;
use uuid::Uuid;

/// Which identity key to regenerate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Access,
    Secret,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Access => "access_key",
            KeyKind::Secret => "secret_key",
        }
    }
}

/// Rotate one key of the user's identity and audit it in the same transaction
pub async fn rotate_identity_key<S: DataStore>(
    store: &S,
    instance_id: Uuid,
    user: &User,
    kind: KeyKind,
) -> Result<Identity> {
    let mut tx = store.begin().await?;
    let identity = identities::find_by_user(&mut tx, user.id).await?;
    let identity = match kind {
        KeyKind::Access => identities::rotate_access_key(&mut tx, identity).await?,
        KeyKind::Secret => identities::rotate_secret_key(&mut tx, identity).await?,
    };

    let entry = AuditLogEntry::new(
        instance_id,
        user,
        AuditAction::IdentityKeyRotated,
        Some(json!({ "key": kind.as_str() })),
    );
    tx.insert_audit_entry(&entry).await?;
    tx.commit().await?;

    Ok(identity)
}
