/// HTTP API for credential-service
///
/// Every endpoint except `/health` requires a bearer token verified by the
/// [`AccessGate`] extractor below. Requests exceeding the configured timeout
/// are dropped, which rolls back any open transaction.
mod identity;
mod logout;
mod recover;
mod templates;

use crate::db::{DataStore, StoreTx};
use crate::error::{CredentialError, Result};
use crate::mailer::RedirectAllowList;
use crate::models::User;
use crate::security::{AccessGate, Claims};
use crate::services::NotificationService;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

/// Shared HTTP server state
pub struct AppState<S: DataStore> {
    pub store: Arc<S>,
    pub gate: AccessGate,
    /// Hosts a template `baseUrl` may point to
    pub redirect_allow_list: RedirectAllowList,
    pub instance_id: Uuid,
    /// Session cookie cleared on logout
    pub cookie_name: Option<String>,
    pub notifications: NotificationService,
}

impl<S: DataStore> AppState<S> {
    /// Resolve the calling user, enforcing that the token was minted for the request audience
    async fn authorized_user(&self, claims: &Claims, headers: &HeaderMap) -> Result<User> {
        let user_id = claims.user_id()?;
        claims.require_audience(&self.gate.request_audience(headers))?;
        self.find_user(user_id).await
    }

    async fn find_user(&self, user_id: Uuid) -> Result<User> {
        let mut tx = self.store.begin().await?;
        tx.find_user(user_id)
            .await?
            .ok_or(CredentialError::NotFound("User"))
    }
}

#[axum::async_trait]
impl<S: DataStore> FromRequestParts<Arc<AppState<S>>> for Claims {
    type Rejection = CredentialError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> std::result::Result<Self, Self::Rejection> {
        state.gate.authenticate(&parts.headers)
    }
}

/// Build the HTTP router with all endpoints
pub fn build_router<S: DataStore>(state: AppState<S>, request_timeout: Duration) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health_check))
        .route("/identity", get(identity::get_identity::<S>))
        .route("/identity/access-key", post(identity::rotate_access_key::<S>))
        .route("/identity/secret-key", post(identity::rotate_secret_key::<S>))
        .route("/logout", post(logout::logout::<S>))
        .route("/templates", post(templates::create_template::<S>))
        .route("/recover", post(recover::recover::<S>))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint (no auth required)
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Start the HTTP server, stopping when `shutdown` resolves
pub async fn start_http_server<S, F>(
    state: AppState<S>,
    host: &str,
    port: u16,
    request_timeout: Duration,
    shutdown: F,
) -> anyhow::Result<()>
where
    S: DataStore,
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = build_router(state, request_timeout);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Starting HTTP API server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
