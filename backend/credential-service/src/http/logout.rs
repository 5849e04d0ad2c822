use super::AppState;
use crate::db::DataStore;
use crate::error::{CredentialError, Result};
use crate::security::Claims;
use crate::services;
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

/// POST /logout: revoke the caller's sessions and clear the session cookie.
///
/// The cookie is cleared on every response, including a rejected bearer token.
pub async fn logout<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    claims: std::result::Result<Claims, CredentialError>,
) -> Response {
    let outcome = match claims {
        Ok(claims) => logout_caller(&state, &claims).await,
        Err(e) => Err(e),
    };
    let mut response = match outcome {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    };

    if let Some(name) = &state.cookie_name {
        match HeaderValue::from_str(&format!("{name}=; Path=/; Max-Age=0; HttpOnly")) {
            Ok(cookie) => {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            Err(e) => warn!(error = %e, "invalid session cookie name"),
        }
    }
    response
}

async fn logout_caller<S: DataStore>(state: &AppState<S>, claims: &Claims) -> Result<()> {
    let user_id = claims.user_id().map_err(invalid_user)?;
    let user = state.find_user(user_id).await.map_err(invalid_user)?;

    services::logout(state.store.as_ref(), state.instance_id, &user).await
}

fn invalid_user(err: CredentialError) -> CredentialError {
    warn!(error = %err, "logout caller could not be resolved");
    CredentialError::Unauthorized("Invalid user".to_string())
}
