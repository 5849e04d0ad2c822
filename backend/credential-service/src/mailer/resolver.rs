use crate::db::{templates, StoreTx};
use crate::error::Result;
use crate::models::{Template, TemplateType};

/// Callback path used when a template does not set one
pub const DEFAULT_CALLBACK_PATH: &str = "/";

/// Subject, body template and callback target for one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub subject: String,
    pub url_template: String,
    pub callback_path: String,
    /// Replaces the configured site origin when set
    pub base_url_override: Option<String>,
}

impl ResolvedTemplate {
    /// Merge an optional override with the system defaults, one field at a time
    pub fn from_override(
        template: Option<&Template>,
        default_subject: &str,
        default_url_template: &str,
    ) -> Self {
        Self {
            subject: non_empty_or(template.map(|t| t.subject.as_str()), default_subject),
            url_template: non_empty_or(
                template.map(|t| t.url_template.as_str()),
                default_url_template,
            ),
            callback_path: non_empty_or(template.map(|t| t.url.as_str()), DEFAULT_CALLBACK_PATH),
            base_url_override: template
                .map(|t| t.base_url.clone())
                .filter(|b| !b.is_empty()),
        }
    }
}

fn non_empty_or(value: Option<&str>, default: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

/// Resolve the template for `(audience, kind)`; a missing override is not an error
pub async fn resolve(
    tx: &mut impl StoreTx,
    audience: &str,
    kind: TemplateType,
    default_subject: &str,
    default_url_template: &str,
) -> Result<ResolvedTemplate> {
    let template = templates::find_template(tx, audience, kind).await?;
    Ok(ResolvedTemplate::from_override(
        template.as_ref(),
        default_subject,
        default_url_template,
    ))
}
