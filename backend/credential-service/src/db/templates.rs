/// Notification template persistence
use super::StoreTx;
use crate::error::Result;
use crate::models::{Template, TemplateType};
use tracing::info;

/// Store `template`, replacing any previous template for the same audience and kind
pub async fn create_template(tx: &mut impl StoreTx, template: &Template) -> Result<()> {
    tx.replace_template(template).await?;

    info!(
        template_id = %template.id,
        aud = %template.aud,
        kind = %template.kind,
        "template stored"
    );
    Ok(())
}

/// Override for `(aud, kind)`; `None` when the audience uses system defaults
pub async fn find_template(
    tx: &mut impl StoreTx,
    aud: &str,
    kind: TemplateType,
) -> Result<Option<Template>> {
    tx.find_template(aud, kind).await
}
