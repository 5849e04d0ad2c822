use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::User;

/// Audited account actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Logout,
    UserRecoveryRequested,
    IdentityKeyRotated,
    TemplateCreated,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Logout => "logout",
            AuditAction::UserRecoveryRequested => "user_recovery_requested",
            AuditAction::IdentityKeyRotated => "identity_key_rotated",
            AuditAction::TemplateCreated => "template_created",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub instance_id: Uuid,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(instance_id: Uuid, actor: &User, action: AuditAction, traits: Option<Value>) -> Self {
        let mut payload = json!({
            "actor_id": actor.id,
            "actor_email": actor.email,
            "action": action.as_str(),
        });
        if let Some(traits) = traits {
            payload["traits"] = traits;
        }

        Self {
            id: Uuid::new_v4(),
            instance_id,
            payload,
            created_at: Utc::now(),
        }
    }

    pub fn action(&self) -> Option<&str> {
        self.payload.get("action").and_then(Value::as_str)
    }
}
