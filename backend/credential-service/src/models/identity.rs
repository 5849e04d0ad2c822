use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-user credential record: rotatable key pair plus the active session binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Identity {
    pub id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    #[serde(rename = "accessKey")]
    pub access_key: String,
    #[serde(rename = "secretKey")]
    pub secret_key: String,
    /// `None` means no active session
    #[serde(rename = "token")]
    #[sqlx(rename = "user_token")]
    pub session_token: Option<String>,
}

/// Columns that may be written individually
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityColumn {
    AccessKey,
    SecretKey,
    SessionToken,
}

impl IdentityColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityColumn::AccessKey => "access_key",
            IdentityColumn::SecretKey => "secret_key",
            IdentityColumn::SessionToken => "user_token",
        }
    }
}

/// Exact-match predicate for identity point lookups
#[derive(Debug, Clone, Copy)]
pub enum IdentityLookup<'a> {
    Id(Uuid),
    User(Uuid),
    SessionToken(&'a str),
}

impl IdentityLookup<'_> {
    pub fn column(&self) -> &'static str {
        match self {
            IdentityLookup::Id(_) => "id",
            IdentityLookup::User(_) => "user_id",
            IdentityLookup::SessionToken(_) => "user_token",
        }
    }

    pub fn matches(&self, identity: &Identity) -> bool {
        match self {
            IdentityLookup::Id(id) => identity.id == *id,
            IdentityLookup::User(user_id) => identity.user_id == *user_id,
            IdentityLookup::SessionToken(token) => {
                identity.session_token.as_deref() == Some(*token)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_json_shape() {
        let identity = Identity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            access_key: "ak".to_string(),
            secret_key: "sk".to_string(),
            session_token: None,
        };

        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["userID"], identity.user_id.to_string());
        assert_eq!(json["accessKey"], "ak");
        assert_eq!(json["secretKey"], "sk");
        assert!(json["token"].is_null());
    }

    #[test]
    fn test_lookup_never_matches_null_token() {
        let identity = Identity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            access_key: "ak".to_string(),
            secret_key: "sk".to_string(),
            session_token: None,
        };

        assert!(!IdentityLookup::SessionToken("").matches(&identity));
        assert!(IdentityLookup::User(identity.user_id).matches(&identity));
    }
}
