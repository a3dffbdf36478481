use std::time::SystemTimeError;

use totp_rs::{Algorithm, Secret, TotpUrlError, TOTP};

#[derive(Debug, thiserror::Error)]
pub enum TotpError {
    #[error("Invalid TOTP secret: {0}")]
    Secret(#[from] TotpUrlError),

    #[error("System clock is before the Unix epoch: {0}")]
    Clock(#[from] SystemTimeError),
}

/// Freshly generated second-factor credentials for a new user.
#[derive(Debug)]
pub struct TotpEnrollment {
    pub secret: String,
    pub url: String,
}

/// Time-based one-time passwords bound to a base32 shared secret.
pub struct Totp {
    secret: String,
    issuer: String,
    account: String,
}

impl Totp {
    pub fn new(secret: &str, issuer: &str, account: &str) -> Self {
        Self {
            secret: secret.to_string(),
            issuer: issuer.to_string(),
            account: account.to_string(),
        }
    }

    /// Generate a new random secret and its `otpauth://` provisioning URL.
    pub fn enroll(issuer: &str, account: &str) -> Result<TotpEnrollment, TotpError> {
        let secret = Secret::generate_secret().to_encoded().to_string();
        let url = Self::new(&secret, issuer, account).build()?.get_url();
        Ok(TotpEnrollment { secret, url })
    }

    /// Check a code against the current 30 second window (one step of skew).
    pub fn is_valid(&self, code: &str) -> bool {
        let checked = self
            .build()
            .and_then(|totp| totp.check_current(code.trim()).map_err(TotpError::from));
        match checked {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!("Cannot check TOTP code for {}: {}", self.account, e);
                false
            }
        }
    }

    /// Code for the current window.
    pub fn current_code(&self) -> Result<String, TotpError> {
        Ok(self.build()?.generate_current()?)
    }

    fn build(&self) -> Result<TOTP, TotpError> {
        let bytes = Secret::Encoded(self.secret.clone())
            .to_bytes()
            .map_err(|_| TotpUrlError::Secret(self.secret.clone()))?;
        let totp = TOTP::new(
            Algorithm::SHA1,
            6,
            1,
            30,
            bytes,
            Some(self.issuer.clone()),
            self.account.clone(),
        )?;
        Ok(totp)
    }
}
