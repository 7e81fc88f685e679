use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::model::{CodePurpose, User, UserStatus};

// =============================================================================
// REGISTER
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = validate_register_passwords))]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub name: String,
    pub phone_number: String,
    #[validate(length(min = 8, max = 100))]
    pub password: String,
    #[validate(length(min = 8, max = 100))]
    pub confirm_password: String,
    #[validate(length(equal = 6))]
    pub code: String,
}

fn validate_register_passwords(req: &RegisterRequest) -> Result<(), ValidationError> {
    if req.password != req.confirm_password {
        return Err(ValidationError::new("password_mismatch")
            .with_message("Password and confirm password do not match".into()));
    }
    Ok(())
}

/// Register response omits the password hash and TOTP secret.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone_number: String,
    pub avatar: Option<String>,
    pub status: UserStatus,
    pub role_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            phone_number: user.phone_number,
            avatar: user.avatar,
            status: user.status,
            role_id: user.role_id,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// =============================================================================
// SEND OTP
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendOtpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub purpose: CodePurpose,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// =============================================================================
// LOGIN
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, max = 100))]
    pub password: String,
    /// 2FA authenticator code, if enrolled.
    #[serde(default)]
    pub totp_code: Option<String>,
    /// Email OTP code (purpose LOGIN), alternative to the TOTP code.
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Client attribution recorded on the device row; supplied by the transport
/// layer from the request's user agent and peer address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub user_agent: String,
    pub ip: String,
}

// =============================================================================
// REFRESH / LOGOUT
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

pub type LogoutRequest = RefreshTokenRequest;

// =============================================================================
// FORGOT PASSWORD
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = validate_forgot_passwords))]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(equal = 6))]
    pub code: String,
    #[validate(length(min = 8, max = 100))]
    pub new_password: String,
    #[validate(length(min = 8, max = 100))]
    pub confirm_new_password: String,
}

fn validate_forgot_passwords(req: &ForgotPasswordRequest) -> Result<(), ValidationError> {
    if req.new_password != req.confirm_new_password {
        return Err(ValidationError::new("password_mismatch")
            .with_message("Password and confirm password do not match".into()));
    }
    Ok(())
}

// =============================================================================
// TWO-FACTOR AUTH
// =============================================================================

#[derive(Debug, Serialize)]
pub struct TwoFactorSetupResponse {
    pub secret: String,
    /// otpauth:// provisioning URI; QR rendering is the client's concern.
    pub uri: String,
}

/// Exactly one of `totp_code` or `code` must be provided.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = validate_disable_two_factor))]
pub struct DisableTwoFactorRequest {
    #[serde(default)]
    pub totp_code: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

fn validate_disable_two_factor(req: &DisableTwoFactorRequest) -> Result<(), ValidationError> {
    if req.totp_code.is_some() == req.code.is_some() {
        return Err(ValidationError::new("second_factor")
            .with_message("Exactly one of totp_code or code must be provided".into()));
    }
    Ok(())
}

// =============================================================================
// GOOGLE OAUTH
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCallbackRequest {
    pub code: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthorizationUrlResponse {
    pub url: String,
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl From<&super::interface::AuthError> for ErrorResponse {
    fn from(err: &super::interface::AuthError) -> Self {
        Self {
            error: err.kind(),
            message: err.to_string(),
        }
    }
}
