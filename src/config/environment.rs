use std::env;

/// Environment configuration
/// Loads and validates environment variables
pub struct Config {
    pub database_url: String,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    /// Access token lifetime in seconds (short-lived).
    pub access_token_expires_secs: i64,
    /// Refresh token lifetime in seconds (long-lived).
    pub refresh_token_expires_secs: i64,
    /// Verification code (OTP) lifetime in seconds.
    pub otp_expires_secs: i64,
    pub totp_issuer: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,
    pub email_api_key: String,
    pub email_from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let access_token_secret = env::var("ACCESS_TOKEN_SECRET")
            .map_err(|_| "ACCESS_TOKEN_SECRET must be set".to_string())?;

        let refresh_token_secret = env::var("REFRESH_TOKEN_SECRET")
            .map_err(|_| "REFRESH_TOKEN_SECRET must be set".to_string())?;

        let access_token_expires_secs = parse_secs("ACCESS_TOKEN_EXPIRES_IN", 15 * 60)?;
        let refresh_token_expires_secs = parse_secs("REFRESH_TOKEN_EXPIRES_IN", 7 * 24 * 3600)?;
        let otp_expires_secs = parse_secs("OTP_EXPIRES_IN", 5 * 60)?;

        let totp_issuer = env::var("TOTP_ISSUER").unwrap_or_else(|_| "Ecommerce".to_string());

        let google_client_id = env::var("GOOGLE_CLIENT_ID")
            .map_err(|_| "GOOGLE_CLIENT_ID must be set".to_string())?;

        let google_client_secret = env::var("GOOGLE_CLIENT_SECRET")
            .map_err(|_| "GOOGLE_CLIENT_SECRET must be set".to_string())?;

        let google_redirect_uri = env::var("GOOGLE_REDIRECT_URI")
            .map_err(|_| "GOOGLE_REDIRECT_URI must be set".to_string())?;

        let email_api_key =
            env::var("EMAIL_API_KEY").map_err(|_| "EMAIL_API_KEY must be set".to_string())?;

        let email_from = env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "Ecommerce <no-reply@example.com>".to_string());

        Ok(Self {
            database_url,
            access_token_secret,
            refresh_token_secret,
            access_token_expires_secs,
            refresh_token_expires_secs,
            otp_expires_secs,
            totp_issuer,
            google_client_id,
            google_client_secret,
            google_redirect_uri,
            email_api_key,
            email_from,
        })
    }
}

fn parse_secs(name: &str, default: i64) -> Result<i64, String> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<i64>()
            .map_err(|_| format!("{} must be a number of seconds", name)),
        Err(_) => Ok(default),
    }
}
