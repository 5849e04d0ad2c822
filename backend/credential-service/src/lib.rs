/// Credential Service Library
///
/// Manages per-user identity credentials, transactional logout and
/// templated account lifecycle mail.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `db`: Store traits, Postgres and in-memory stores, identity/template operations
/// - `error`: Error types
/// - `http`: axum router and handlers
/// - `mailer`: Template resolution, callback URLs, mail transport
/// - `models`: Data models
/// - `security`: Secure token generation, bearer token verification
/// - `services`: Logout, key rotation, notifications
/// - `validators`: Input validation
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod mailer;
pub mod models;
pub mod security;
pub mod services;
pub mod validators;

// Re-export commonly used types
pub use error::{CredentialError, Result};
pub use http::{build_router, AppState};
