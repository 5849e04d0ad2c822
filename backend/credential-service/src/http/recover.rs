use super::AppState;
use crate::db::DataStore;
use crate::error::{CredentialError, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RecoverParams {
    #[validate(email)]
    pub email: String,
}

/// POST /recover: start password recovery; unknown addresses get the same response
pub async fn recover<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let params: RecoverParams = serde_json::from_slice(&body).map_err(|e| {
        CredentialError::Validation(format!("Could not read verification params: {}", e))
    })?;
    params.validate()?;

    let audience = state.gate.request_audience(&headers);
    let referrer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok());

    state
        .notifications
        .request_recovery(
            state.store.as_ref(),
            state.instance_id,
            &audience,
            params.email.trim(),
            referrer,
        )
        .await?;

    Ok(Json(json!({})))
}
