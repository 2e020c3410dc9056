use crate::{models::TwoFactorCredential, totp, Error, Result};

impl TwoFactorCredential {
    /// Whether no credential has ever been issued
    pub fn is_not_setup(&self) -> bool {
        matches!(self, TwoFactorCredential::NotSetup)
    }

    /// Whether two-factor is active on the account
    pub fn is_enabled(&self) -> bool {
        matches!(self, TwoFactorCredential::Enabled { .. })
    }

    // Generate the current TOTP code from the stored secret
    pub fn current_code(&self) -> Result<String> {
        if let TwoFactorCredential::Enabled { secret, .. }
        | TwoFactorCredential::Pending { secret, .. } = &self
        {
            Ok(totp::totp(secret))
        } else {
            Err(Error::OperationFailed)
        }
    }
}
