use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The slice of the user record this service reads.
///
/// Users are provisioned elsewhere; only the recovery token is written here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub instance_id: Uuid,
    pub aud: String,
    pub email: String,
    pub confirmation_token: Option<String>,
    pub recovery_token: Option<String>,
    pub recovery_sent_at: Option<DateTime<Utc>>,
    pub email_change_token: Option<String>,
    pub email_change: Option<String>,
    pub user_metadata: serde_json::Value,
}

impl User {
    pub fn new(instance_id: Uuid, aud: &str, email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            instance_id,
            aud: aud.to_string(),
            email: email.to_string(),
            confirmation_token: None,
            recovery_token: None,
            recovery_sent_at: None,
            email_change_token: None,
            email_change: None,
            user_metadata: serde_json::Value::Object(Default::default()),
        }
    }
}
