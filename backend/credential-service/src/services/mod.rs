/// Service layer for credential-service
///
/// Units of work composed from the store primitives:
/// - Logout (audit + refresh-token revocation, then identity-token reset)
/// - Identity key rotation with audit trail
/// - Notification mail (template resolution + dispatch, password recovery)
pub mod keys;
pub mod logout;
pub mod notifications;

pub use keys::{rotate_identity_key, KeyKind};
pub use logout::logout;
pub use notifications::NotificationService;
