use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::services::email::OtpMailer;
use crate::services::hashing;
use crate::services::jwt::JwtService;
use crate::services::otp::VerificationCodeStore;
use crate::services::roles::RolesService;
use crate::services::totp::TwoFactorService;

use super::interface::{
    AuthError, DeviceRepository, RefreshTokenRepository, RepoError, Result, UserRepository,
};
use super::model::{CodePurpose, Device, RefreshToken, User, UserStatus};
use super::schema::{
    ClientInfo, DisableTwoFactorRequest, ForgotPasswordRequest, LoginRequest, LogoutRequest,
    MessageResponse, RefreshTokenRequest, RegisterRequest, SendOtpRequest, TokenPairResponse,
    TwoFactorSetupResponse, UserResponse,
};

/// Top-level coordinator for every identity/session operation. Holds the
/// persistence contracts and the specialized services, and owns the
/// per-operation state machines.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    devices: Arc<dyn DeviceRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    roles: RolesService,
    codes: VerificationCodeStore,
    mailer: Arc<dyn OtpMailer>,
    jwt: JwtService,
    totp: TwoFactorService,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        devices: Arc<dyn DeviceRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        roles: RolesService,
        codes: VerificationCodeStore,
        mailer: Arc<dyn OtpMailer>,
        jwt: JwtService,
        totp: TwoFactorService,
    ) -> Self {
        Self {
            users,
            devices,
            refresh_tokens,
            roles,
            codes,
            mailer,
            jwt,
            totp,
        }
    }

    pub(crate) fn roles(&self) -> &RolesService {
        &self.roles
    }

    pub(crate) fn users(&self) -> &Arc<dyn UserRepository> {
        &self.users
    }

    pub(crate) fn devices(&self) -> &Arc<dyn DeviceRepository> {
        &self.devices
    }

    // =========================================================================
    // REGISTER
    // =========================================================================

    pub async fn register(&self, req: RegisterRequest) -> Result<UserResponse> {
        self.codes
            .validate(&req.email, &req.code, CodePurpose::Register)
            .await?;

        let role_id = self.roles.client_role_id().await?;
        let password_hash =
            hashing::hash_password(&req.password).map_err(|e| AuthError::Internal(e.to_string()))?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: req.email.clone(),
            name: req.name,
            phone_number: req.phone_number,
            password_hash,
            avatar: None,
            totp_secret: None,
            status: UserStatus::Active,
            role_id,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        // The code was just validated; consume it alongside user creation.
        // A uniqueness conflict on email surfaces as EmailAlreadyExists, and
        // the consumed code stays consumed (a fresh OTP can be requested).
        let create = async {
            self.users.create(&user).await.map_err(|e| match e {
                RepoError::UniqueViolation => AuthError::EmailAlreadyExists,
                other => AuthError::from(other),
            })
        };
        let consume = async {
            self.codes
                .consume(&req.email, &req.code, CodePurpose::Register)
                .await
                .map_err(AuthError::from)
        };
        tokio::try_join!(create, consume)?;

        Ok(UserResponse::from(user))
    }

    // =========================================================================
    // SEND OTP
    // =========================================================================

    pub async fn send_otp(&self, req: SendOtpRequest) -> Result<MessageResponse> {
        let user = self.users.find_by_email(&req.email).await?;
        if req.purpose == CodePurpose::Register && user.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }
        if req.purpose == CodePurpose::ForgotPassword && user.is_none() {
            return Err(AuthError::EmailNotFound);
        }

        let code = self.codes.issue(&req.email, req.purpose).await?;

        // The persisted code is not rolled back on delivery failure; a
        // provider retry can still use it.
        if let Err(e) = self.mailer.send_otp(&req.email, &code).await {
            tracing::warn!(error = %e, "failed to deliver OTP email");
            return Err(AuthError::OtpDeliveryFailed);
        }

        Ok(MessageResponse {
            message: "OTP sent successfully",
        })
    }

    // =========================================================================
    // LOGIN
    // =========================================================================

    pub async fn login(&self, req: LoginRequest, client: ClientInfo) -> Result<TokenPairResponse> {
        let with_role = self
            .users
            .find_by_email_with_role(&req.email)
            .await?
            .ok_or(AuthError::EmailNotFound)?;
        let user = with_role.user;

        let password_ok = hashing::verify_password(&req.password, &user.password_hash)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !password_ok {
            return Err(AuthError::InvalidPassword);
        }

        if let Some(secret) = &user.totp_secret {
            self.verify_second_factor(
                secret,
                &user.email,
                req.totp_code.as_deref(),
                req.code.as_deref(),
                CodePurpose::Login,
            )
            .await?;
        }

        let device = Device::new(&user.id, &client.user_agent, &client.ip);
        self.devices.create(&device).await?;

        self.generate_tokens(&user.id, &device.id, &user.role_id, &with_role.role.name)
            .await
    }

    /// Shared second-factor check for login and 2FA disable: exactly one proof
    /// (TOTP code or email OTP) must be supplied and valid. The TOTP path wins
    /// when both arrive.
    async fn verify_second_factor(
        &self,
        secret: &str,
        email: &str,
        totp_code: Option<&str>,
        code: Option<&str>,
        purpose: CodePurpose,
    ) -> Result<()> {
        match (totp_code, code) {
            (None, None) => Err(AuthError::MissingSecondFactor),
            (Some(totp_code), _) => {
                if !self.totp.verify(secret, totp_code, email) {
                    return Err(AuthError::InvalidTotp);
                }
                Ok(())
            }
            (None, Some(code)) => {
                self.codes.validate(email, code, purpose).await?;
                self.codes.consume(email, code, purpose).await?;
                Ok(())
            }
        }
    }

    // =========================================================================
    // TOKEN PAIR ISSUANCE
    // =========================================================================

    /// Single path by which refresh token rows are created: login, refresh and
    /// OAuth login all route through here so rotation and device binding stay
    /// consistent.
    pub(crate) async fn generate_tokens(
        &self,
        user_id: &str,
        device_id: &str,
        role_id: &str,
        role_name: &str,
    ) -> Result<TokenPairResponse> {
        let access_token = self
            .jwt
            .sign_access_token(user_id, device_id, role_id, role_name)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let refresh_token = self
            .jwt
            .sign_refresh_token(user_id)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        // The persisted expiry is derived from the token's own exp claim.
        let decoded = self
            .jwt
            .verify_refresh_token(&refresh_token)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let expires_at = DateTime::<Utc>::from_timestamp(decoded.claims.exp, 0)
            .ok_or_else(|| AuthError::Internal("refresh exp out of range".to_string()))?;

        self.refresh_tokens
            .create(&RefreshToken {
                token: refresh_token.clone(),
                user_id: user_id.to_string(),
                device_id: device_id.to_string(),
                expires_at,
                created_at: Utc::now(),
            })
            .await?;

        Ok(TokenPairResponse {
            access_token,
            refresh_token,
        })
    }

    // =========================================================================
    // REFRESH
    // =========================================================================

    pub async fn refresh_token(
        &self,
        req: RefreshTokenRequest,
        client: ClientInfo,
    ) -> Result<TokenPairResponse> {
        // Everything that is not already a typed auth failure collapses to
        // Unauthorized: a client holding a suspect token learns nothing about
        // why it was rejected.
        match self.refresh_token_inner(req, client).await {
            Err(AuthError::Repo(_)) | Err(AuthError::Internal(_)) => Err(AuthError::Unauthorized),
            other => other,
        }
    }

    async fn refresh_token_inner(
        &self,
        req: RefreshTokenRequest,
        client: ClientInfo,
    ) -> Result<TokenPairResponse> {
        self.jwt
            .verify_refresh_token(&req.refresh_token)
            .map_err(|_| AuthError::Unauthorized)?;

        // A syntactically valid, unexpired token with no row was already
        // consumed or revoked: possible theft, fail closed.
        let stored = self
            .refresh_tokens
            .find_with_user(&req.refresh_token)
            .await?
            .ok_or(AuthError::RefreshTokenAlreadyUsed)?;

        let device_id = stored.token.device_id.clone();
        let user_id = stored.user.id.clone();

        let touch = async {
            self.devices
                .touch(&device_id, &client.user_agent, &client.ip)
                .await
                .map_err(AuthError::from)
        };
        // A concurrent refresh can win the row delete after both passed the
        // lookup above; the loser reports the token as used.
        let delete = async {
            self.refresh_tokens
                .delete(&req.refresh_token)
                .await
                .map(|_| ())
                .map_err(|e| match e {
                    RepoError::NotFound => AuthError::RefreshTokenAlreadyUsed,
                    other => AuthError::from(other),
                })
        };
        let issue = self.generate_tokens(
            &user_id,
            &device_id,
            &stored.user.role_id,
            &stored.role.name,
        );

        let (tokens, (), ()) = tokio::try_join!(issue, delete, touch)?;
        Ok(tokens)
    }

    // =========================================================================
    // LOGOUT
    // =========================================================================

    pub async fn logout(&self, req: LogoutRequest) -> Result<MessageResponse> {
        // Expired tokens may still be logged out; only the signature must hold.
        self.jwt
            .verify_refresh_token_allow_expired(&req.refresh_token)
            .map_err(|_| AuthError::Unauthorized)?;

        // A token whose row is already gone was rotated or revoked; repeat
        // logouts are rejected rather than silently accepted.
        let deleted = self
            .refresh_tokens
            .delete(&req.refresh_token)
            .await
            .map_err(|e| match e {
                RepoError::NotFound => AuthError::RefreshTokenAlreadyUsed,
                other => AuthError::from(other),
            })?;

        self.devices
            .deactivate(&deleted.device_id)
            .await
            .map_err(|_| AuthError::Unauthorized)?;

        Ok(MessageResponse {
            message: "Logout successful",
        })
    }

    // =========================================================================
    // FORGOT PASSWORD
    // =========================================================================

    pub async fn forgot_password(&self, req: ForgotPasswordRequest) -> Result<MessageResponse> {
        let user = self
            .users
            .find_by_email(&req.email)
            .await?
            .ok_or(AuthError::EmailNotFound)?;

        self.codes
            .validate(&req.email, &req.code, CodePurpose::ForgotPassword)
            .await?;

        let password_hash = hashing::hash_password(&req.new_password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let update = async {
            self.users
                .update_password(&user.id, &password_hash)
                .await
                .map_err(AuthError::from)
        };
        let consume = async {
            self.codes
                .consume(&req.email, &req.code, CodePurpose::ForgotPassword)
                .await
                .map_err(AuthError::from)
        };
        tokio::try_join!(update, consume)?;

        Ok(MessageResponse {
            message: "Password changed successfully",
        })
    }

    // =========================================================================
    // TWO-FACTOR AUTH
    // =========================================================================

    pub async fn setup_two_factor(&self, user_id: &str) -> Result<TwoFactorSetupResponse> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::EmailNotFound)?;
        if user.totp_secret.is_some() {
            return Err(AuthError::TotpAlreadyEnabled);
        }

        let (secret, uri) = self
            .totp
            .generate_secret(&user.email)
            .map_err(AuthError::Internal)?;

        self.users
            .set_totp_secret(&user.id, Some(&secret))
            .await?;

        Ok(TwoFactorSetupResponse { secret, uri })
    }

    pub async fn disable_two_factor(
        &self,
        user_id: &str,
        req: DisableTwoFactorRequest,
    ) -> Result<MessageResponse> {
        // Mutual exclusivity is rechecked here so the invariant holds even
        // when the transport layer skipped schema validation.
        if req.totp_code.is_some() == req.code.is_some() {
            return Err(AuthError::MissingSecondFactor);
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::EmailNotFound)?;
        let secret = user.totp_secret.as_deref().ok_or(AuthError::TotpNotEnabled)?;

        self.verify_second_factor(
            secret,
            &user.email,
            req.totp_code.as_deref(),
            req.code.as_deref(),
            CodePurpose::Disable2fa,
        )
        .await?;

        self.users.set_totp_secret(&user.id, None).await?;

        Ok(MessageResponse {
            message: "Two-factor auth disabled successfully",
        })
    }
}
