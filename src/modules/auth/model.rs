use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Purpose a verification code was issued for. A code only validates against
/// the purpose it was issued with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
pub enum CodePurpose {
    #[sqlx(rename = "REGISTER")]
    #[serde(rename = "REGISTER")]
    Register,
    #[sqlx(rename = "FORGOT_PASSWORD")]
    #[serde(rename = "FORGOT_PASSWORD")]
    ForgotPassword,
    #[sqlx(rename = "LOGIN")]
    #[serde(rename = "LOGIN")]
    Login,
    #[sqlx(rename = "DISABLE_2FA")]
    #[serde(rename = "DISABLE_2FA")]
    Disable2fa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    Active,
    Inactive,
    Blocked,
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone_number: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    /// Base32 TOTP secret; `Some` means two-factor auth is enrolled.
    pub totp_secret: Option<String>,
    pub status: UserStatus,
    pub role_id: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user row joined with its role, as needed by login and refresh.
#[derive(Debug, Clone)]
pub struct UserWithRole {
    pub user: User,
    pub role: Role,
}

/// Short-lived 6-digit code keyed by (email, purpose); re-issuing for the
/// same pair overwrites code and expiry in place.
#[derive(Debug, Clone, FromRow)]
pub struct VerificationCode {
    pub email: String,
    pub code: String,
    pub purpose: CodePurpose,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl VerificationCode {
    pub fn new(email: &str, code: &str, purpose: CodePurpose, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            email: email.to_string(),
            code: code.to_string(),
            purpose,
            expires_at: now + ttl,
            created_at: now,
        }
    }
}

/// One row per login, recording the client that authenticated. Never deleted;
/// logout only clears `is_active`.
#[derive(Debug, Clone, FromRow)]
pub struct Device {
    pub id: String,
    pub user_id: String,
    pub user_agent: String,
    pub ip: String,
    pub last_active: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Device {
    pub fn new(user_id: &str, user_agent: &str, ip: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            user_agent: user_agent.to_string(),
            ip: ip.to_string(),
            last_active: now,
            is_active: true,
            created_at: now,
        }
    }
}

/// One row per issued refresh token. The row is deleted exactly once: either
/// consumed by a refresh or removed by logout. A token string without a row is
/// treated as already used, never as "not yet issued".
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: String,
    pub device_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A refresh token row joined back to its owning user and role, as needed by
/// the rotation path.
#[derive(Debug, Clone)]
pub struct RefreshTokenWithUser {
    pub token: RefreshToken,
    pub user: User,
    pub role: Role,
}
