/// Security primitives for the credential service
///
/// - **tokens**: secure random credential material
/// - **claims**: bearer JWT verification and audience checks (access gate)
pub mod claims;
pub mod tokens;

pub use claims::{AccessGate, AppMetadata, Claims};
pub use tokens::secure_token;
