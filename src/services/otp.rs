use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;

use crate::modules::auth::interface::{AuthError, RepoError, VerificationCodeRepository};
use crate::modules::auth::model::{CodePurpose, VerificationCode};

/// Random 6-digit decimal code, zero-padded.
pub fn generate_otp() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{:06}", n)
}

/// Issue/validate/consume lifecycle for short-lived verification codes.
/// Issuing overwrites the previous code for the same (email, purpose), so at
/// most one code per pair is live and only the latest validates.
#[derive(Clone)]
pub struct VerificationCodeStore {
    repo: Arc<dyn VerificationCodeRepository>,
    ttl: Duration,
}

impl VerificationCodeStore {
    pub fn new(repo: Arc<dyn VerificationCodeRepository>, ttl_secs: i64) -> Self {
        Self {
            repo,
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Generates and persists a fresh code, returning it for out-of-band
    /// delivery.
    pub async fn issue(&self, email: &str, purpose: CodePurpose) -> Result<String, RepoError> {
        let code = generate_otp();
        let row = VerificationCode::new(email, &code, purpose, self.ttl);
        self.repo.upsert(&row).await?;
        Ok(code)
    }

    /// Checks the exact (email, code, purpose) triple and its expiry. Does not
    /// consume; callers delete separately so a failed validation never
    /// destroys state.
    pub async fn validate(
        &self,
        email: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> Result<VerificationCode, AuthError> {
        let row = self
            .repo
            .find(email, code, purpose)
            .await?
            .ok_or(AuthError::InvalidCode)?;
        if row.expires_at < Utc::now() {
            return Err(AuthError::CodeExpired);
        }
        Ok(row)
    }

    /// Deletes the code. Deleting an already-consumed code is not an error.
    pub async fn consume(
        &self,
        email: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> Result<(), RepoError> {
        self.repo.delete(email, code, purpose).await
    }
}
