use async_trait::async_trait;

use super::model::{
    CodePurpose, Device, RefreshToken, RefreshTokenWithUser, Role, User, UserWithRole,
};

// =============================================================================
// REPOSITORY TRAITS
// =============================================================================

pub type RepoResult<T> = std::result::Result<T, RepoError>;

/// Failure kinds the storage layer must distinguish. The orchestrator branches
/// on `UniqueViolation` (register) and `NotFound` (code/token consumption);
/// everything else propagates as `Database`.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("unique constraint violated")]
    UniqueViolation,

    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::UniqueViolation,
            _ => RepoError::Database(e),
        }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> RepoResult<()>;
    async fn find_by_id(&self, id: &str) -> RepoResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn find_by_email_with_role(&self, email: &str) -> RepoResult<Option<UserWithRole>>;
    async fn update_password(&self, user_id: &str, password_hash: &str) -> RepoResult<()>;
    async fn set_totp_secret(&self, user_id: &str, secret: Option<&str>) -> RepoResult<()>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Role>>;
}

#[async_trait]
pub trait VerificationCodeRepository: Send + Sync {
    /// Insert-or-overwrite keyed by (email, purpose): a re-issue replaces the
    /// existing code and expiry rather than adding a row.
    async fn upsert(&self, code: &super::model::VerificationCode) -> RepoResult<()>;
    /// Exact-triple lookup; a stale (overwritten) code no longer matches.
    async fn find(
        &self,
        email: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> RepoResult<Option<super::model::VerificationCode>>;
    /// Deletes the matching row if present. Deleting an absent row is not an
    /// error; concurrent consumers may race on it.
    async fn delete(&self, email: &str, code: &str, purpose: CodePurpose) -> RepoResult<()>;
}

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn create(&self, device: &Device) -> RepoResult<()>;
    /// Refreshes user agent, ip and last-active on an existing device.
    async fn touch(&self, device_id: &str, user_agent: &str, ip: &str) -> RepoResult<()>;
    /// Marks the device logged out. History is kept.
    async fn deactivate(&self, device_id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn create(&self, token: &RefreshToken) -> RepoResult<()>;
    async fn find_with_user(&self, token: &str) -> RepoResult<Option<RefreshTokenWithUser>>;
    /// Deletes by exact token string and returns the deleted row.
    /// `NotFound` here is the reuse-detection signal.
    async fn delete(&self, token: &str) -> RepoResult<RefreshToken>;
}

// =============================================================================
// ERROR TAXONOMY
// =============================================================================

pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Email not found")]
    EmailNotFound,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Invalid OTP code")]
    InvalidCode,

    #[error("OTP code has expired")]
    CodeExpired,

    #[error("Either a TOTP code or an email OTP code is required")]
    MissingSecondFactor,

    #[error("Invalid TOTP code")]
    InvalidTotp,

    #[error("Two-factor auth is already enabled")]
    TotpAlreadyEnabled,

    #[error("Two-factor auth is not enabled")]
    TotpNotEnabled,

    #[error("Refresh token has already been used")]
    RefreshTokenAlreadyUsed,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Failed to send OTP email")]
    OtpDeliveryFailed,

    #[error("Identity provider did not return an email address")]
    GoogleUserInfo,

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable kind for error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            Self::EmailNotFound => "EMAIL_NOT_FOUND",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::InvalidCode => "INVALID_CODE",
            Self::CodeExpired => "CODE_EXPIRED",
            Self::MissingSecondFactor => "MISSING_SECOND_FACTOR",
            Self::InvalidTotp => "INVALID_TOTP",
            Self::TotpAlreadyEnabled => "TOTP_ALREADY_ENABLED",
            Self::TotpNotEnabled => "TOTP_NOT_ENABLED",
            Self::RefreshTokenAlreadyUsed => "REFRESH_TOKEN_ALREADY_USED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::OtpDeliveryFailed => "OTP_DELIVERY_FAILED",
            Self::GoogleUserInfo => "GOOGLE_USER_INFO_ERROR",
            Self::Repo(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::EmailAlreadyExists => StatusCode::CONFLICT,
            Self::EmailNotFound => StatusCode::NOT_FOUND,
            Self::InvalidPassword => StatusCode::UNAUTHORIZED,
            Self::InvalidCode => StatusCode::BAD_REQUEST,
            Self::CodeExpired => StatusCode::BAD_REQUEST,
            Self::MissingSecondFactor => StatusCode::BAD_REQUEST,
            Self::InvalidTotp => StatusCode::UNAUTHORIZED,
            Self::TotpAlreadyEnabled => StatusCode::BAD_REQUEST,
            Self::TotpNotEnabled => StatusCode::BAD_REQUEST,
            Self::RefreshTokenAlreadyUsed => StatusCode::UNAUTHORIZED,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::OtpDeliveryFailed => StatusCode::INTERNAL_SERVER_ERROR,
            Self::GoogleUserInfo => StatusCode::BAD_GATEWAY,
            Self::Repo(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
