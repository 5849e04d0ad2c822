use super::AppState;
use crate::db::{identities, DataStore};
use crate::error::Result;
use crate::models::Identity;
use crate::security::Claims;
use crate::services::{rotate_identity_key, KeyKind};
use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;
use tracing::info;

/// GET /identity: the caller's own identity
pub async fn get_identity<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    claims: Claims,
) -> Result<Json<Identity>> {
    let user = state.authorized_user(&claims, &headers).await?;

    let mut tx = state.store.begin().await?;
    let identity = identities::find_by_user(&mut tx, user.id).await?;
    Ok(Json(identity))
}

/// POST /identity/access-key
pub async fn rotate_access_key<S: DataStore>(
    state: State<Arc<AppState<S>>>,
    headers: HeaderMap,
    claims: Claims,
) -> Result<Json<Identity>> {
    rotate(state, headers, claims, KeyKind::Access).await
}

/// POST /identity/secret-key
pub async fn rotate_secret_key<S: DataStore>(
    state: State<Arc<AppState<S>>>,
    headers: HeaderMap,
    claims: Claims,
) -> Result<Json<Identity>> {
    rotate(state, headers, claims, KeyKind::Secret).await
}

async fn rotate<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    claims: Claims,
    kind: KeyKind,
) -> Result<Json<Identity>> {
    let user = state.authorized_user(&claims, &headers).await?;
    let identity = rotate_identity_key(state.store.as_ref(), state.instance_id, &user, kind).await?;

    info!(user_id = %user.id, key = kind.as_str(), "identity key rotated via API");
    Ok(Json(identity))
}
