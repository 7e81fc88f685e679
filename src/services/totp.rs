use totp_rs::{Algorithm, Secret, TOTP};

// Standard authenticator-app parameters: 6 digits, 30 second step, ±1 step skew.
const DIGITS: usize = 6;
const SKEW: u8 = 1;
const STEP: u64 = 30;

#[derive(Clone)]
pub struct TwoFactorService {
    issuer: String,
}

impl TwoFactorService {
    pub fn new(issuer: String) -> Self {
        Self { issuer }
    }

    /// Generates a fresh random secret and the otpauth provisioning URI for
    /// the given account label.
    pub fn generate_secret(&self, account: &str) -> Result<(String, String), String> {
        let secret = Secret::generate_secret();
        let totp = self
            .build(secret.to_bytes().map_err(|e| format!("{:?}", e))?, account)
            .map_err(|e| e.to_string())?;
        let encoded = match secret.to_encoded() {
            Secret::Encoded(s) => s,
            Secret::Raw(_) => unreachable!("to_encoded always yields the encoded form"),
        };
        Ok((encoded, totp.get_url()))
    }

    /// Time-window comparison of a submitted code against an enrolled secret.
    /// A wrong code is a normal outcome, not an error.
    pub fn verify(&self, secret: &str, code: &str, account: &str) -> bool {
        let Ok(bytes) = Secret::Encoded(secret.to_string()).to_bytes() else {
            return false;
        };
        let Ok(totp) = self.build(bytes, account) else {
            return false;
        };
        totp.check_current(code).unwrap_or(false)
    }

    fn build(&self, secret: Vec<u8>, account: &str) -> Result<TOTP, totp_rs::TotpUrlError> {
        TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            SKEW,
            STEP,
            secret,
            Some(self.issuer.clone()),
            account.to_string(),
        )
    }
}
