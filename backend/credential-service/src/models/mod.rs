/// Data models for identities, users, templates and audit entries
pub mod audit;
pub mod identity;
pub mod refresh_token;
pub mod template;
pub mod user;

pub use audit::{AuditAction, AuditLogEntry};
pub use identity::{Identity, IdentityColumn, IdentityLookup};
pub use refresh_token::RefreshToken;
pub use template::{Template, TemplateType};
pub use user::User;
