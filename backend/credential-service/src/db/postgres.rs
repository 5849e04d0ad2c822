/// PostgreSQL implementation of the store traits
use super::{DataStore, StoreTx, TableNames};
use crate::error::Result;
use crate::models::{
    AuditLogEntry, Identity, IdentityColumn, IdentityLookup, Template, TemplateType, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use uuid::Uuid;

const IDENTITY_COLUMNS: &str = "id, user_id, access_key, secret_key, user_token";
const USER_COLUMNS: &str = "id, instance_id, aud, email, confirmation_token, recovery_token, \
     recovery_sent_at, email_change_token, email_change, user_metadata";
const TEMPLATE_COLUMNS: &str = "id, aud, type, subject, url, base_url, url_template";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    tables: Arc<TableNames>,
}

impl PgStore {
    /// `namespace` prefixes every table name (`<namespace>.identities`).
    pub fn new(pool: PgPool, namespace: Option<&str>) -> Result<Self> {
        Ok(Self {
            pool,
            tables: Arc::new(TableNames::new(namespace)?),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DataStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx> {
        let tx = self.pool.begin().await?;
        Ok(PgTx {
            tx,
            tables: Arc::clone(&self.tables),
        })
    }
}

/// Open transaction; rolled back by sqlx when dropped uncommitted
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
    tables: Arc<TableNames>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn insert_identity(&mut self, identity: &Identity) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} ({IDENTITY_COLUMNS}) VALUES ($1, $2, $3, $4, $5)",
            self.tables.identities
        );
        sqlx::query(&sql)
            .bind(identity.id)
            .bind(identity.user_id)
            .bind(&identity.access_key)
            .bind(&identity.secret_key)
            .bind(identity.session_token.as_deref())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn find_identity(&mut self, lookup: IdentityLookup<'_>) -> Result<Option<Identity>> {
        let sql = format!(
            "SELECT {IDENTITY_COLUMNS} FROM {} WHERE {} = $1 LIMIT 1",
            self.tables.identities,
            lookup.column()
        );
        let query = sqlx::query_as::<_, Identity>(&sql);
        let query = match lookup {
            IdentityLookup::Id(id) | IdentityLookup::User(id) => query.bind(id),
            IdentityLookup::SessionToken(token) => query.bind(token),
        };

        Ok(query.fetch_optional(&mut *self.tx).await?)
    }

    async fn update_identity_column(
        &mut self,
        identity_id: Uuid,
        column: IdentityColumn,
        value: Option<&str>,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET {} = $1 WHERE id = $2",
            self.tables.identities,
            column.as_str()
        );
        sqlx::query(&sql)
            .bind(value)
            .bind(identity_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn find_user(&mut self, user_id: Uuid) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM {} WHERE id = $1",
            self.tables.users
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(user)
    }

    async fn find_user_by_email(
        &mut self,
        instance_id: Uuid,
        aud: &str,
        email: &str,
    ) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM {} WHERE instance_id = $1 AND aud = $2 AND LOWER(email) = LOWER($3) LIMIT 1",
            self.tables.users
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(instance_id)
            .bind(aud)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(user)
    }

    async fn set_recovery_token(
        &mut self,
        user_id: Uuid,
        token: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET recovery_token = $1, recovery_sent_at = $2 WHERE id = $3",
            self.tables.users
        );
        sqlx::query(&sql)
            .bind(token)
            .bind(sent_at)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn find_template(&mut self, aud: &str, kind: TemplateType) -> Result<Option<Template>> {
        let sql = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM {} WHERE aud = $1 AND type = $2 LIMIT 1",
            self.tables.templates
        );
        let template = sqlx::query_as::<_, Template>(&sql)
            .bind(aud)
            .bind(kind.as_str())
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(template)
    }

    async fn replace_template(&mut self, template: &Template) -> Result<()> {
        let delete = format!(
            "DELETE FROM {} WHERE aud = $1 AND type = $2",
            self.tables.templates
        );
        sqlx::query(&delete)
            .bind(&template.aud)
            .bind(template.kind.as_str())
            .execute(&mut *self.tx)
            .await?;

        let insert = format!(
            "INSERT INTO {} ({TEMPLATE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            self.tables.templates
        );
        sqlx::query(&insert)
            .bind(template.id)
            .bind(&template.aud)
            .bind(template.kind.as_str())
            .bind(&template.subject)
            .bind(&template.url)
            .bind(&template.base_url)
            .bind(&template.url_template)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn insert_audit_entry(&mut self, entry: &AuditLogEntry) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (id, instance_id, payload, created_at) VALUES ($1, $2, $3, $4)",
            self.tables.audit_log_entries
        );
        sqlx::query(&sql)
            .bind(entry.id)
            .bind(entry.instance_id)
            .bind(&entry.payload)
            .bind(entry.created_at)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn revoke_refresh_tokens(&mut self, instance_id: Uuid, user_id: Uuid) -> Result<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE instance_id = $1 AND user_id = $2",
            self.tables.refresh_tokens
        );
        let result = sqlx::query(&sql)
            .bind(instance_id)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
