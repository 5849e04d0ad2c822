/// Identity credential operations
///
/// Every lookup goes through [`find_identity`] so not-found semantics are the
/// same for all predicates. Rotations write only the rotated column.
use super::StoreTx;
use crate::error::{CredentialError, Result};
use crate::models::{Identity, IdentityColumn, IdentityLookup};
use crate::security::secure_token;
use tracing::info;
use uuid::Uuid;

/// Build a fresh identity for `user_id` without persisting it
pub fn new_identity(user_id: Uuid) -> Result<Identity> {
    Ok(Identity {
        id: Uuid::new_v4(),
        user_id,
        access_key: secure_token()?,
        secret_key: secure_token()?,
        session_token: None,
    })
}

/// Create and persist the identity of a newly provisioned user
pub async fn create(tx: &mut impl StoreTx, user_id: Uuid) -> Result<Identity> {
    let identity = new_identity(user_id)?;
    tx.insert_identity(&identity).await?;

    info!(identity_id = %identity.id, user_id = %user_id, "identity created");
    Ok(identity)
}

async fn find_identity(tx: &mut impl StoreTx, lookup: IdentityLookup<'_>) -> Result<Identity> {
    tx.find_identity(lookup)
        .await?
        .ok_or(CredentialError::NotFound("Identity"))
}

pub async fn find_by_id(tx: &mut impl StoreTx, id: Uuid) -> Result<Identity> {
    find_identity(tx, IdentityLookup::Id(id)).await
}

pub async fn find_by_user(tx: &mut impl StoreTx, user_id: Uuid) -> Result<Identity> {
    find_identity(tx, IdentityLookup::User(user_id)).await
}

/// Look up the identity bound to an active session token.
///
/// The empty token never matches: it stands for "no session".
pub async fn find_by_token(tx: &mut impl StoreTx, token: &str) -> Result<Identity> {
    if token.is_empty() {
        return Err(CredentialError::NotFound("Identity"));
    }
    find_identity(tx, IdentityLookup::SessionToken(token)).await
}

pub async fn rotate_access_key(tx: &mut impl StoreTx, mut identity: Identity) -> Result<Identity> {
    let access_key = secure_token()?;
    tx.update_identity_column(identity.id, IdentityColumn::AccessKey, Some(&access_key))
        .await?;
    identity.access_key = access_key;

    info!(identity_id = %identity.id, "identity access key rotated");
    Ok(identity)
}

pub async fn rotate_secret_key(tx: &mut impl StoreTx, mut identity: Identity) -> Result<Identity> {
    let secret_key = secure_token()?;
    tx.update_identity_column(identity.id, IdentityColumn::SecretKey, Some(&secret_key))
        .await?;
    identity.secret_key = secret_key;

    info!(identity_id = %identity.id, "identity secret key rotated");
    Ok(identity)
}

/// Bind the identity to a session token; the empty string clears it
pub async fn set_session_token(
    tx: &mut impl StoreTx,
    mut identity: Identity,
    token: &str,
) -> Result<Identity> {
    let value = (!token.is_empty()).then_some(token);
    tx.update_identity_column(identity.id, IdentityColumn::SessionToken, value)
        .await?;
    identity.session_token = value.map(str::to_string);

    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DataStore, MemoryStore};
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_create_generates_distinct_keys() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        let identity = create(&mut tx, user_id).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(identity.user_id, user_id);
        assert!(!identity.access_key.is_empty());
        assert!(!identity.secret_key.is_empty());
        assert_ne!(identity.access_key, identity.secret_key);
        assert!(identity.session_token.is_none());
        assert_eq!(store.identity_for_user(user_id), Some(identity));
    }

    #[tokio::test]
    async fn test_one_identity_per_user() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        create(&mut tx, user_id).await.unwrap();
        let err = create(&mut tx, user_id).await.unwrap_err();
        assert!(matches!(err, CredentialError::Database(_)));
    }

    #[tokio::test]
    async fn test_lookups_not_found() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        assert!(matches!(
            find_by_id(&mut tx, Uuid::new_v4()).await,
            Err(CredentialError::NotFound("Identity"))
        ));
        assert!(matches!(
            find_by_user(&mut tx, Uuid::new_v4()).await,
            Err(CredentialError::NotFound("Identity"))
        ));
        assert!(matches!(
            find_by_token(&mut tx, "").await,
            Err(CredentialError::NotFound("Identity"))
        ));
    }

    #[tokio::test]
    async fn test_lookup_store_fault_is_not_not_found() {
        let store = MemoryStore::new();
        store.inject_fault(crate::db::FaultPoint::FindIdentity);
        let mut tx = store.begin().await.unwrap();

        assert!(matches!(
            find_by_user(&mut tx, Uuid::new_v4()).await,
            Err(CredentialError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_rotate_access_key_leaves_other_columns() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        let identity = create(&mut tx, user_id).await.unwrap();
        let identity = set_session_token(&mut tx, identity, "session-1").await.unwrap();
        tx.commit().await.unwrap();

        let a0 = identity.access_key.clone();
        let mut tx = store.begin().await.unwrap();
        let rotated = rotate_access_key(&mut tx, identity.clone()).await.unwrap();
        let a1 = rotated.access_key.clone();
        let rotated = rotate_access_key(&mut tx, rotated).await.unwrap();
        tx.commit().await.unwrap();

        assert_ne!(a0, a1);
        assert_ne!(a1, rotated.access_key);
        assert_eq!(rotated.secret_key, identity.secret_key);
        assert_eq!(rotated.session_token.as_deref(), Some("session-1"));

        let mut tx = store.begin().await.unwrap();
        let stored = find_by_user(&mut tx, user_id).await.unwrap();
        assert_eq!(stored, rotated);
    }

    #[tokio::test]
    async fn test_rotate_access_key_sample_has_no_repeats() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut identity = create(&mut tx, Uuid::new_v4()).await.unwrap();

        let mut seen = HashSet::new();
        seen.insert(identity.access_key.clone());
        for _ in 0..200 {
            identity = rotate_access_key(&mut tx, identity).await.unwrap();
            assert!(seen.insert(identity.access_key.clone()));
        }
    }

    #[tokio::test]
    async fn test_rotate_secret_key() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let identity = create(&mut tx, Uuid::new_v4()).await.unwrap();

        let rotated = rotate_secret_key(&mut tx, identity.clone()).await.unwrap();
        assert_ne!(rotated.secret_key, identity.secret_key);
        assert_eq!(rotated.access_key, identity.access_key);
    }

    #[tokio::test]
    async fn test_session_token_set_find_and_clear() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let identity = create(&mut tx, Uuid::new_v4()).await.unwrap();

        let bound = set_session_token(&mut tx, identity, "tok-123").await.unwrap();
        assert_eq!(find_by_token(&mut tx, "tok-123").await.unwrap().id, bound.id);

        let cleared = set_session_token(&mut tx, bound, "").await.unwrap();
        assert!(cleared.session_token.is_none());
        assert!(find_by_token(&mut tx, "tok-123").await.is_err());
        assert!(find_by_id(&mut tx, cleared.id)
            .await
            .unwrap()
            .session_token
            .is_none());
    }

    #[tokio::test]
    async fn test_session_token_must_be_unique() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let first = create(&mut tx, Uuid::new_v4()).await.unwrap();
        let second = create(&mut tx, Uuid::new_v4()).await.unwrap();

        set_session_token(&mut tx, first, "shared").await.unwrap();
        assert!(set_session_token(&mut tx, second, "shared").await.is_err());
    }
}
