use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access token claims: enough to authorize a request without a user lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String, // user id
    pub device_id: String,
    pub role_id: String,
    pub role_name: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Refresh token claims: identity only; authority comes from the stored row.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String, // user id
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Expired and tampered tokens carry different security implications; callers
/// branch on the kind.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e),
        }
    }
}

pub struct JwtService {
    access_secret: String,
    refresh_secret: String,
    access_token_duration: Duration,
    refresh_token_duration: Duration,
}

impl JwtService {
    pub fn new(
        access_secret: String,
        refresh_secret: String,
        access_token_secs: i64,
        refresh_token_secs: i64,
    ) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_token_duration: Duration::seconds(access_token_secs),
            refresh_token_duration: Duration::seconds(refresh_token_secs),
        }
    }

    pub fn sign_access_token(
        &self,
        user_id: &str,
        device_id: &str,
        role_id: &str,
        role_name: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            device_id: device_id.to_string(),
            role_id: role_id.to_string(),
            role_name: role_name.to_string(),
            exp: (now + self.access_token_duration).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.access_secret.as_bytes()),
        )
    }

    pub fn sign_refresh_token(&self, user_id: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            exp: (now + self.refresh_token_duration).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.refresh_secret.as_bytes()),
        )
    }

    pub fn verify_access_token(&self, token: &str) -> Result<TokenData<AccessClaims>, TokenError> {
        Ok(decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.access_secret.as_bytes()),
            &Validation::default(),
        )?)
    }

    pub fn verify_refresh_token(
        &self,
        token: &str,
    ) -> Result<TokenData<RefreshClaims>, TokenError> {
        Ok(decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.refresh_secret.as_bytes()),
            &Validation::default(),
        )?)
    }

    /// Signature-only check used by logout: an expired refresh token may still
    /// be revoked.
    pub fn verify_refresh_token_allow_expired(
        &self,
        token: &str,
    ) -> Result<TokenData<RefreshClaims>, TokenError> {
        let mut validation = Validation::default();
        validation.validate_exp = false;
        Ok(decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.refresh_secret.as_bytes()),
            &validation,
        )?)
    }
}
