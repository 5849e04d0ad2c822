use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Notification kind a template overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    Invite,
    Confirmation,
    Recovery,
    EmailChange,
}

impl TemplateType {
    pub const ALL: [TemplateType; 4] = [
        TemplateType::Invite,
        TemplateType::Confirmation,
        TemplateType::Recovery,
        TemplateType::EmailChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Invite => "invite",
            TemplateType::Confirmation => "confirmation",
            TemplateType::Recovery => "recovery",
            TemplateType::EmailChange => "email_change",
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown template type: {0}")]
pub struct UnknownTemplateType(pub String);

impl FromStr for TemplateType {
    type Err = UnknownTemplateType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownTemplateType(s.to_string()))
    }
}

impl TryFrom<String> for TemplateType {
    type Error = UnknownTemplateType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Per-audience override of a notification's subject, callback path and body template.
///
/// Empty strings mean "use the system default".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Template {
    pub id: Uuid,
    pub aud: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub kind: TemplateType,
    pub subject: String,
    pub url: String,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "urlTemplate")]
    pub url_template: String,
}

impl Template {
    pub fn new(aud: &str, kind: TemplateType, subject: &str, url: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            aud: aud.to_string(),
            kind,
            subject: subject.to_string(),
            url: url.to_string(),
            base_url: String::new(),
            url_template: String::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_url_template(mut self, url_template: &str) -> Self {
        self.url_template = url_template.to_string();
        self
    }
}
