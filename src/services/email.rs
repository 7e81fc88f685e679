use async_trait::async_trait;
use serde::Serialize;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("email provider returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Out-of-band OTP delivery. Single best-effort call, no retry; the caller
/// decides what a delivery failure means.
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(&self, email: &str, code: &str) -> Result<(), EmailError>;
}

/// Resend-backed mailer.
pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(http: reqwest::Client, api_key: String, from: String) -> Self {
        Self {
            http,
            api_key,
            from,
        }
    }
}

#[derive(Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
}

#[async_trait]
impl OtpMailer for ResendMailer {
    async fn send_otp(&self, email: &str, code: &str) -> Result<(), EmailError> {
        let subject = "OTP Verification";
        let body = SendEmailBody {
            from: &self.from,
            to: [email],
            subject,
            html: format!(
                "<h2>{}</h2><p>Your verification code is <strong>{}</strong>. \
                 It expires shortly; do not share it with anyone.</p>",
                subject, code
            ),
        };

        let response = self
            .http
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "OTP email delivery rejected by provider");
            return Err(EmailError::Status(status));
        }
        Ok(())
    }
}
