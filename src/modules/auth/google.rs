use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::services::hashing;
use crate::services::roles::CLIENT_ROLE_NAME;

use super::interface::{AuthError, Result};
use super::model::{Device, User, UserStatus};
use super::schema::{AuthorizationUrlResponse, ClientInfo, GoogleCallbackRequest, TokenPairResponse};
use super::service::AuthService;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const SCOPES: &str = "https://www.googleapis.com/auth/userinfo.email \
                      https://www.googleapis.com/auth/userinfo.profile";

/// Federated login against Google. Exchanges the authorization code, resolves
/// or creates the local account, then finishes exactly like a password login.
pub struct GoogleService {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    auth: Arc<AuthService>,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

/// Profile fields returned by the userinfo endpoint. Everything is optional
/// on the wire; only the email is required downstream.
#[derive(Debug, Default, Deserialize)]
pub struct GoogleProfile {
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl GoogleService {
    pub fn new(
        http: reqwest::Client,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        auth: Arc<AuthService>,
    ) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            redirect_uri,
            auth,
        }
    }

    /// Authorization URL for the client redirect. The state parameter carries
    /// base64-encoded client attribution; it is informational only and never
    /// treated as a credential.
    pub fn authorization_url(&self, client: &ClientInfo) -> Result<AuthorizationUrlResponse> {
        let url = build_authorization_url(
            &self.client_id,
            &self.redirect_uri,
            &encode_state(client),
        )?;
        Ok(AuthorizationUrlResponse { url })
    }

    pub async fn callback(&self, req: GoogleCallbackRequest) -> Result<TokenPairResponse> {
        let client = decode_state(req.state.as_deref());

        let access_token = self.exchange_code(&req.code).await?;
        let profile = self.fetch_userinfo(&access_token).await?;
        self.complete_login(profile, client).await
    }

    /// Finishes a federated login from an authenticated provider profile:
    /// resolves or provisions the local account, records the device, and
    /// issues the token pair.
    pub async fn complete_login(
        &self,
        profile: GoogleProfile,
        client: ClientInfo,
    ) -> Result<TokenPairResponse> {
        let email = profile.email.ok_or(AuthError::GoogleUserInfo)?;

        let (user_id, role_id, role_name) = match self
            .auth
            .users()
            .find_by_email_with_role(&email)
            .await?
        {
            Some(with_role) => (
                with_role.user.id,
                with_role.user.role_id,
                with_role.role.name,
            ),
            None => {
                let user = self
                    .create_federated_user(&email, profile.name, profile.picture)
                    .await?;
                (user.id, user.role_id, CLIENT_ROLE_NAME.to_string())
            }
        };

        let device = Device::new(&user_id, &client.user_agent, &client.ip);
        self.auth.devices().create(&device).await?;

        self.auth
            .generate_tokens(&user_id, &device.id, &role_id, &role_name)
            .await
    }

    /// First OAuth login creates the account: a random password keeps the
    /// hash-not-null invariant while the user authenticates via the provider.
    async fn create_federated_user(
        &self,
        email: &str,
        name: Option<String>,
        picture: Option<String>,
    ) -> Result<User> {
        let role_id = self.auth.roles().client_role_id().await?;
        let password_hash = hashing::hash_password(&Uuid::new_v4().to_string())
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.unwrap_or_default(),
            phone_number: String::new(),
            password_hash,
            avatar: picture,
            totp_secret: None,
            status: UserStatus::Active,
            role_id,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.auth.users().create(&user).await?;
        Ok(user)
    }

    async fn exchange_code(&self, code: &str) -> Result<String> {
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Google code exchange rejected");
            return Err(AuthError::Internal(format!(
                "Google token endpoint returned {}",
                response.status()
            )));
        }

        let tokens: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(tokens.access_token)
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleProfile> {
        let response = self
            .http
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::GoogleUserInfo);
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))
    }
}

fn build_authorization_url(client_id: &str, redirect_uri: &str, state: &str) -> Result<String> {
    let url = reqwest::Url::parse_with_params(
        AUTH_ENDPOINT,
        &[
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", SCOPES),
            ("access_type", "offline"),
            ("include_granted_scopes", "true"),
            ("state", state),
        ],
    )
    .map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok(url.into())
}

fn encode_state(client: &ClientInfo) -> String {
    serde_json::to_vec(client)
        .map(|bytes| BASE64.encode(bytes))
        .unwrap_or_default()
}

/// Best-effort decode of the state blob; any failure degrades to Unknown
/// attribution rather than failing the login.
fn decode_state(state: Option<&str>) -> ClientInfo {
    let unknown = ClientInfo {
        user_agent: "Unknown".to_string(),
        ip: "Unknown".to_string(),
    };
    let Some(state) = state else {
        return unknown;
    };
    let decoded = match BASE64.decode(state) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to base64-decode OAuth state");
            return unknown;
        }
    };
    match serde_json::from_slice::<ClientInfo>(&decoded) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse OAuth state payload");
            unknown
        }
    }
}
