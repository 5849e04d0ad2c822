/// Bearer token verification for inbound requests.
///
/// Tokens are HS256 JWTs minted by the session layer. The gate only verifies
/// them and exposes subject and audience; it never issues tokens.
use crate::error::{CredentialError, Result};
use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header carrying the audience the caller is acting for
pub const AUDIENCE_HEADER: &str = "x-jwt-aud";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub aud: String,
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

/// Operator-managed metadata carried in the token
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Claims {
    /// Parse the subject as a user id
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| CredentialError::Validation("Could not read User ID claim".to_string()))
    }

    fn has_role(&self, admin_roles: &[String]) -> bool {
        admin_roles
            .iter()
            .any(|admin| *admin == self.role || self.app_metadata.roles.contains(admin))
    }

    /// Reject claims minted for a different audience than the request targets
    pub fn require_audience(&self, request_audience: &str) -> Result<()> {
        if self.aud != request_audience {
            return Err(CredentialError::AudienceMismatch);
        }
        Ok(())
    }
}

pub struct AccessGate {
    decoding_key: DecodingKey,
    validation: Validation,
    default_audience: String,
    admin_roles: Vec<String>,
}

impl AccessGate {
    pub fn new(secret: &str, default_audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Audience is compared against the request audience by handlers
        validation.validate_aud = false;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            default_audience: default_audience.to_string(),
            admin_roles: vec!["admin".to_string()],
        }
    }

    /// Roles allowed to call administrative endpoints
    pub fn with_admin_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.admin_roles = roles
            .into_iter()
            .map(Into::into)
            .filter(|r: &String| !r.is_empty())
            .collect();
        self
    }

    /// Reject callers whose token carries none of the admin roles
    pub fn require_admin(&self, claims: &Claims) -> Result<()> {
        if claims.has_role(&self.admin_roles) {
            Ok(())
        } else {
            Err(CredentialError::Forbidden(
                "Administrator role required".to_string(),
            ))
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Extract and verify the bearer token of a request
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Claims> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CredentialError::Unauthorized("Missing bearer token".to_string()))?;

        self.verify(token)
    }

    /// Audience requested by the caller, or the configured default
    pub fn request_audience(&self, headers: &HeaderMap) -> String {
        headers
            .get(AUDIENCE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(&self.default_audience)
            .to_string()
    }
}
