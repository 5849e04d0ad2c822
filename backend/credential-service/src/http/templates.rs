use super::AppState;
use crate::db::{templates, DataStore, StoreTx};
use crate::error::{CredentialError, Result};
use crate::mailer::url::checked_base_url;
use crate::models::{AuditAction, AuditLogEntry, Template, TemplateType};
use crate::security::Claims;
use crate::validators;
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TemplateParams {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    #[validate(custom(function = "relative_callback"))]
    pub url: String,
    #[serde(default)]
    #[validate(custom(function = "absolute_base_url"))]
    pub base_url: String,
    #[serde(default)]
    pub url_template: String,
}

fn relative_callback(url: &str) -> std::result::Result<(), ValidationError> {
    if validators::validate_callback_path(url) {
        Ok(())
    } else {
        Err(ValidationError::new("relative_path"))
    }
}

fn absolute_base_url(base_url: &str) -> std::result::Result<(), ValidationError> {
    if validators::validate_base_url(base_url) {
        Ok(())
    } else {
        Err(ValidationError::new("absolute_url"))
    }
}

/// POST /templates: create or replace the caller audience's template of one kind.
///
/// Administrators only; a `baseUrl` must point to an allow-listed host.
pub async fn create_template<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    claims: Claims,
    body: Bytes,
) -> Result<Json<Template>> {
    let audience = state.gate.request_audience(&headers);
    claims.require_audience(&audience)?;
    state.gate.require_admin(&claims)?;

    let params: TemplateParams = serde_json::from_slice(&body).map_err(|e| {
        CredentialError::Validation(format!("Could not read Template params: {}", e))
    })?;
    let kind: TemplateType = params
        .kind
        .parse()
        .map_err(|_| CredentialError::Validation("Template type not found".to_string()))?;
    params.validate()?;
    if !params.base_url.is_empty() {
        checked_base_url(&params.base_url, &state.redirect_allow_list)?;
    }

    let template = Template::new(&audience, kind, &params.subject, &params.url)
        .with_base_url(&params.base_url)
        .with_url_template(&params.url_template);

    let mut tx = state.store.begin().await?;
    templates::create_template(&mut tx, &template).await?;
    if let Some(actor) = tx.find_user(claims.user_id()?).await? {
        let entry = AuditLogEntry::new(
            state.instance_id,
            &actor,
            AuditAction::TemplateCreated,
            Some(json!({ "template_id": template.id, "type": kind.as_str() })),
        );
        tx.insert_audit_entry(&entry).await?;
    }
    tx.commit().await?;

    Ok(Json(template))
}
