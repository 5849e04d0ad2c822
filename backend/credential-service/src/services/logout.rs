use crate::db::{identities, DataStore, StoreTx};
use crate::error::{CredentialError, Result};
use crate::models::{AuditAction, AuditLogEntry, User};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Invalidate every session of `user`.
///
/// Audit entry and refresh-token revocation commit together in a first
/// transaction; any failure there leaves nothing behind and surfaces as
/// [`CredentialError::Transaction`]. The identity session token is then
/// cleared in a second transaction. If only that second step fails the
/// sessions are already revoked and [`CredentialError::SessionReset`] is
/// returned so the caller can retry the reset alone.
pub async fn logout<S: DataStore>(store: &S, instance_id: Uuid, user: &User) -> Result<()> {
    let revoked = match revoke_sessions(store, instance_id, user).await {
        Ok(revoked) => revoked,
        Err(e) => {
            error!(user_id = %user.id, error = %e, "logout transaction failed");
            return Err(CredentialError::Transaction(format!(
                "Error logging out user: {}",
                e
            )));
        }
    };
    info!(user_id = %user.id, revoked, "user sessions revoked");

    if let Err(e) = reset_identity_token(store, user.id).await {
        warn!(
            user_id = %user.id,
            error = %e,
            "sessions revoked but identity token reset failed"
        );
        return Err(CredentialError::SessionReset(format!(
            "Error clearing identity token: {}",
            e
        )));
    }

    Ok(())
}

async fn revoke_sessions<S: DataStore>(store: &S, instance_id: Uuid, user: &User) -> Result<u64> {
    let mut tx = store.begin().await?;
    let entry = AuditLogEntry::new(instance_id, user, AuditAction::Logout, None);
    tx.insert_audit_entry(&entry).await?;
    let revoked = tx.revoke_refresh_tokens(instance_id, user.id).await?;
    tx.commit().await?;
    Ok(revoked)
}

async fn reset_identity_token<S: DataStore>(store: &S, user_id: Uuid) -> Result<()> {
    let mut tx = store.begin().await?;
    let identity = identities::find_by_user(&mut tx, user_id).await?;
    let identity = identities::set_session_token(&mut tx, identity, "").await?;
    tx.commit().await?;

    info!(identity_id = %identity.id, "identity session token cleared");
    Ok(())
}
