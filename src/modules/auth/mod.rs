pub mod crud;
pub mod google;
pub mod interface;
pub mod model;
pub mod schema;
pub mod service;

use std::sync::Arc;

use crate::config::{Config, DbPool};
use crate::services::email::ResendMailer;
use crate::services::jwt::JwtService;
use crate::services::otp::VerificationCodeStore;
use crate::services::roles::RolesService;
use crate::services::totp::TwoFactorService;

use crud::{DeviceCrud, RefreshTokenCrud, RoleCrud, UserCrud, VerificationCodeCrud};
use google::GoogleService;
use service::AuthService;

/// Wires the MySQL-backed orchestrator and the Google federator from a pool
/// and the environment configuration.
pub fn build(pool: DbPool, config: &Config) -> (Arc<AuthService>, GoogleService) {
    let http = reqwest::Client::new();

    let auth = Arc::new(AuthService::new(
        Arc::new(UserCrud::new(pool.clone())),
        Arc::new(DeviceCrud::new(pool.clone())),
        Arc::new(RefreshTokenCrud::new(pool.clone())),
        RolesService::new(Arc::new(RoleCrud::new(pool.clone()))),
        VerificationCodeStore::new(
            Arc::new(VerificationCodeCrud::new(pool)),
            config.otp_expires_secs,
        ),
        Arc::new(ResendMailer::new(
            http.clone(),
            config.email_api_key.clone(),
            config.email_from.clone(),
        )),
        JwtService::new(
            config.access_token_secret.clone(),
            config.refresh_token_secret.clone(),
            config.access_token_expires_secs,
            config.refresh_token_expires_secs,
        ),
        TwoFactorService::new(config.totp_issuer.clone()),
    ));

    let google = GoogleService::new(
        http,
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        config.google_redirect_uri.clone(),
        auth.clone(),
    );

    (auth, google)
}
