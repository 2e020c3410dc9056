use iso8601_timestamp::Timestamp;

use crate::models::{
    Account, AttemptMethod, RequestMetadata, TwoFactorAttempt, TwoFactorCredential,
    TwoFactorSetup, TwoFactorStatus, TwoFactorVerification,
};
use crate::{totp, Error, Result, Success, Tillauth};

impl Account {
    /// Begin two-factor enrollment
    ///
    /// Issues a fresh secret and a fresh batch of backup codes, replacing
    /// any pending enrollment. The credential stays inactive until the
    /// user proves possession of the secret through `enable_two_factor`.
    pub async fn setup_two_factor(
        &mut self,
        tillauth: &Tillauth,
        device_name: Option<String>,
    ) -> Result<TwoFactorSetup> {
        if self.two_factor.is_enabled() {
            return Err(Error::TwoFactorAlreadyEnabled);
        }

        let secret = totp::generate_secret();
        let backup_codes = totp::generate_backup_codes();

        self.two_factor = TwoFactorCredential::Pending {
            secret: secret.clone(),
            backup_codes: backup_codes.clone(),
            device_name,
            setup_at: Timestamp::now_utc(),
        };

        tillauth
            .database
            .update_two_factor(&self.id, &self.two_factor)
            .await?;

        Ok(TwoFactorSetup {
            manual_entry_key: totp::manual_entry_key(&secret),
            provisioning_uri: totp::provisioning_uri(&tillauth.config.issuer, &self.email, &secret),
            secret,
            backup_codes,
        })
    }

    /// Activate a pending enrollment
    ///
    /// Only a fresh TOTP code proves the authenticator was provisioned;
    /// backup codes are not accepted here. A wrong code leaves the
    /// credential untouched.
    pub async fn enable_two_factor(
        &mut self,
        tillauth: &Tillauth,
        code: &str,
        metadata: RequestMetadata,
    ) -> Result<bool> {
        let (secret, backup_codes, device_name, setup_at) = match &self.two_factor {
            TwoFactorCredential::Pending {
                secret,
                backup_codes,
                device_name,
                setup_at,
            } => (
                secret.clone(),
                backup_codes.clone(),
                device_name.clone(),
                *setup_at,
            ),
            TwoFactorCredential::Enabled { .. } => return Err(Error::TwoFactorAlreadyEnabled),
            _ => return Err(Error::TwoFactorNotSetup),
        };

        if !totp::verify(&secret, code, tillauth.config.verification_window) {
            tillauth
                .log_attempt(TwoFactorAttempt::failure(
                    &self.id,
                    AttemptMethod::Totp,
                    metadata,
                    "Invalid verification code",
                ))
                .await;

            return Ok(false);
        }

        let now = Timestamp::now_utc();
        self.two_factor = TwoFactorCredential::Enabled {
            secret,
            backup_codes,
            device_name,
            setup_at,
            enabled_at: now,
            last_used: Some(now),
            codes_regenerated_at: None,
        };

        tillauth
            .database
            .update_two_factor(&self.id, &self.two_factor)
            .await?;

        tillauth
            .log_attempt(TwoFactorAttempt::success(
                &self.id,
                AttemptMethod::Totp,
                metadata,
            ))
            .await;

        Ok(true)
    }

    /// Verify a code at login
    ///
    /// Tries the TOTP value first and falls back to the backup code list.
    /// A matching backup code is spent through a conditional update at the
    /// store, so two logins racing for the same code cannot both succeed.
    pub async fn verify_two_factor(
        &mut self,
        tillauth: &Tillauth,
        code: &str,
        metadata: RequestMetadata,
    ) -> Result<TwoFactorVerification> {
        let secret = if let TwoFactorCredential::Enabled { secret, .. } = &self.two_factor {
            secret.clone()
        } else {
            return Err(Error::TwoFactorNotEnabled);
        };

        let now = Timestamp::now_utc();

        if totp::verify(&secret, code, tillauth.config.verification_window) {
            tillauth.database.touch_two_factor(&self.id, now).await?;

            if let TwoFactorCredential::Enabled { last_used, .. } = &mut self.two_factor {
                *last_used = Some(now);
            }

            tillauth
                .log_attempt(TwoFactorAttempt::success(
                    &self.id,
                    AttemptMethod::Totp,
                    metadata,
                ))
                .await;

            return Ok(TwoFactorVerification::Valid {
                method: AttemptMethod::Totp,
            });
        }

        if tillauth
            .database
            .consume_backup_code(&self.id, code, now)
            .await?
        {
            if let TwoFactorCredential::Enabled {
                backup_codes,
                last_used,
                ..
            } = &mut self.two_factor
            {
                backup_codes.retain(|candidate| candidate != code);
                *last_used = Some(now);
            }

            tillauth
                .log_attempt(TwoFactorAttempt::success(
                    &self.id,
                    AttemptMethod::BackupCode,
                    metadata,
                ))
                .await;

            return Ok(TwoFactorVerification::Valid {
                method: AttemptMethod::BackupCode,
            });
        }

        tillauth
            .log_attempt(TwoFactorAttempt::failure(
                &self.id,
                AttemptMethod::Totp,
                metadata,
                "Invalid code",
            ))
            .await;

        Ok(TwoFactorVerification::Invalid)
    }

    /// Disable two-factor authentication
    ///
    /// Accepts a TOTP code or a current backup code as proof. The backup
    /// code is not spent: the whole credential is discarded on success and
    /// re-enrollment starts over from `setup_two_factor`.
    pub async fn disable_two_factor(
        &mut self,
        tillauth: &Tillauth,
        code: &str,
        metadata: RequestMetadata,
    ) -> Result<bool> {
        let (secret, backup_codes) = match &self.two_factor {
            TwoFactorCredential::Enabled {
                secret,
                backup_codes,
                ..
            } => (secret.clone(), backup_codes.clone()),
            _ => return Err(Error::TwoFactorNotEnabled),
        };

        let method = if totp::verify(&secret, code, tillauth.config.verification_window) {
            AttemptMethod::Totp
        } else if backup_codes.iter().any(|candidate| candidate == code) {
            AttemptMethod::BackupCode
        } else {
            tillauth
                .log_attempt(TwoFactorAttempt::failure(
                    &self.id,
                    AttemptMethod::Totp,
                    metadata,
                    "Invalid code",
                ))
                .await;

            return Ok(false);
        };

        self.two_factor = TwoFactorCredential::Disabled {
            disabled_at: Timestamp::now_utc(),
        };

        tillauth
            .database
            .update_two_factor(&self.id, &self.two_factor)
            .await?;

        tillauth
            .log_attempt(TwoFactorAttempt::success(&self.id, method, metadata))
            .await;

        Ok(true)
    }

    /// Replace the backup code list
    ///
    /// Requires a TOTP code: the last backup code must not be able to mint
    /// ten new ones without the authenticator present. A wrong code is an
    /// error here rather than a `false` return.
    pub async fn regenerate_backup_codes(
        &mut self,
        tillauth: &Tillauth,
        code: &str,
        metadata: RequestMetadata,
    ) -> Result<Vec<String>> {
        let secret = match &self.two_factor {
            TwoFactorCredential::Enabled { secret, .. } => secret.clone(),
            _ => return Err(Error::TwoFactorNotEnabled),
        };

        if !totp::verify(&secret, code, tillauth.config.verification_window) {
            tillauth
                .log_attempt(TwoFactorAttempt::failure(
                    &self.id,
                    AttemptMethod::Totp,
                    metadata,
                    "Invalid verification code",
                ))
                .await;

            return Err(Error::InvalidCredentials);
        }

        let codes = totp::generate_backup_codes();

        if let TwoFactorCredential::Enabled {
            backup_codes,
            codes_regenerated_at,
            ..
        } = &mut self.two_factor
        {
            *backup_codes = codes.clone();
            *codes_regenerated_at = Some(Timestamp::now_utc());
        }

        tillauth
            .database
            .update_two_factor(&self.id, &self.two_factor)
            .await?;

        tillauth
            .log_attempt(TwoFactorAttempt::success(
                &self.id,
                AttemptMethod::Totp,
                metadata,
            ))
            .await;

        Ok(codes)
    }

    /// Point-in-time view of the account's two-factor state
    ///
    /// Pure read: no store access, no audit record.
    pub fn two_factor_status(&self) -> TwoFactorStatus {
        match &self.two_factor {
            TwoFactorCredential::Enabled {
                backup_codes,
                device_name,
                setup_at,
                last_used,
                ..
            } => TwoFactorStatus {
                enabled: true,
                setup_at: Some(*setup_at),
                last_used: *last_used,
                backup_codes_remaining: backup_codes.len(),
                device_name: device_name.clone(),
            },
            TwoFactorCredential::Pending {
                backup_codes,
                device_name,
                setup_at,
                ..
            } => TwoFactorStatus {
                enabled: false,
                setup_at: Some(*setup_at),
                last_used: None,
                backup_codes_remaining: backup_codes.len(),
                device_name: device_name.clone(),
            },
            _ => TwoFactorStatus {
                enabled: false,
                setup_at: None,
                last_used: None,
                backup_codes_remaining: 0,
                device_name: None,
            },
        }
    }

    /// Disable two-factor without a code, as a break-glass action
    ///
    /// The audit record attributing the action to the acting administrator
    /// is mandatory: it is written first and its failure aborts the
    /// disable.
    pub async fn emergency_disable_two_factor(
        &mut self,
        tillauth: &Tillauth,
        acting_admin: &Account,
    ) -> Success {
        tillauth
            .database
            .save_attempt(&TwoFactorAttempt::emergency_disable(
                &self.id,
                &acting_admin.id,
            ))
            .await?;

        self.two_factor = TwoFactorCredential::Disabled {
            disabled_at: Timestamp::now_utc(),
        };

        tillauth
            .database
            .update_two_factor(&self.id, &self.two_factor)
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::test::*;
    use crate::totp;

    // Seven digits, can match neither a TOTP value nor a backup code
    const WRONG_CODE: &str = "0000000";

    fn unix_time() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[async_std::test]
    async fn full_happy_path() {
        let (tillauth, mut account) = for_test_account().await;

        let setup = account
            .setup_two_factor(&tillauth, Some("Front counter iPad".into()))
            .await
            .unwrap();

        assert_eq!(setup.backup_codes.len(), 10);
        assert!(setup
            .provisioning_uri
            .starts_with("otpauth://totp/Tillpoint:"));
        assert!(!account.two_factor_status().enabled);

        let code = totp::totp(&setup.secret);
        assert!(account
            .enable_two_factor(&tillauth, &code, Default::default())
            .await
            .unwrap());
        assert!(account.two_factor_status().enabled);

        // A code from the next time step is inside the default window
        let next = totp::totp_at(&setup.secret, unix_time() + 30);
        let verification = account
            .verify_two_factor(&tillauth, &next, Default::default())
            .await
            .unwrap();
        assert_eq!(
            verification,
            TwoFactorVerification::Valid {
                method: AttemptMethod::Totp
            }
        );
        assert!(account.two_factor_status().last_used.is_some());

        let verification = account
            .verify_two_factor(&tillauth, &setup.backup_codes[0], Default::default())
            .await
            .unwrap();
        assert_eq!(
            verification,
            TwoFactorVerification::Valid {
                method: AttemptMethod::BackupCode
            }
        );
        assert_eq!(account.two_factor_status().backup_codes_remaining, 9);
    }

    #[async_std::test]
    async fn backup_codes_are_single_use() {
        let (tillauth, mut account, setup) = for_test_enabled().await;
        let code = &setup.backup_codes[3];

        assert!(account
            .verify_two_factor(&tillauth, code, Default::default())
            .await
            .unwrap()
            .is_valid());
        assert_eq!(account.two_factor_status().backup_codes_remaining, 9);

        assert!(!account
            .verify_two_factor(&tillauth, code, Default::default())
            .await
            .unwrap()
            .is_valid());
        assert_eq!(account.two_factor_status().backup_codes_remaining, 9);
    }

    #[async_std::test]
    async fn enable_rejects_backup_codes() {
        let (tillauth, mut account) = for_test_account().await;
        let setup = account.setup_two_factor(&tillauth, None).await.unwrap();

        assert!(!account
            .enable_two_factor(&tillauth, &setup.backup_codes[0], Default::default())
            .await
            .unwrap());
        assert!(!account.two_factor_status().enabled);
    }

    #[async_std::test]
    async fn enable_requires_a_pending_setup() {
        let (tillauth, mut account) = for_test_account().await;

        assert_eq!(
            account
                .enable_two_factor(&tillauth, WRONG_CODE, Default::default())
                .await,
            Err(Error::TwoFactorNotSetup)
        );
    }

    #[async_std::test]
    async fn setup_overwrites_a_pending_enrollment() {
        let (tillauth, mut account) = for_test_account().await;

        let first = account.setup_two_factor(&tillauth, None).await.unwrap();
        let second = account.setup_two_factor(&tillauth, None).await.unwrap();

        assert_ne!(first.secret, second.secret);

        // Codes for the replaced secret no longer activate the enrollment
        let stale = totp::totp(&first.secret);
        assert!(!account
            .enable_two_factor(&tillauth, &stale, Default::default())
            .await
            .unwrap());

        let fresh = totp::totp(&second.secret);
        assert!(account
            .enable_two_factor(&tillauth, &fresh, Default::default())
            .await
            .unwrap());
    }

    #[async_std::test]
    async fn setup_is_rejected_while_enabled() {
        let (tillauth, mut account, _) = for_test_enabled().await;

        assert!(matches!(
            account.setup_two_factor(&tillauth, None).await,
            Err(Error::TwoFactorAlreadyEnabled)
        ));
    }

    #[async_std::test]
    async fn disable_requires_proof() {
        let (tillauth, mut account, setup) = for_test_enabled().await;

        assert!(!account
            .disable_two_factor(&tillauth, WRONG_CODE, Default::default())
            .await
            .unwrap());
        assert!(account.two_factor_status().enabled);

        let code = totp::totp(&setup.secret);
        assert!(account
            .disable_two_factor(&tillauth, &code, Default::default())
            .await
            .unwrap());
        assert!(!account.two_factor_status().enabled);

        // The credential was discarded, a later login cannot use it
        assert_eq!(
            account
                .verify_two_factor(&tillauth, &code, Default::default())
                .await,
            Err(Error::TwoFactorNotEnabled)
        );
    }

    #[async_std::test]
    async fn disable_accepts_a_backup_code_without_spending_it() {
        let (tillauth, mut account, setup) = for_test_enabled().await;

        assert!(account
            .disable_two_factor(&tillauth, &setup.backup_codes[0], Default::default())
            .await
            .unwrap());
        assert!(!account.two_factor_status().enabled);
    }

    #[async_std::test]
    async fn regenerate_resets_the_batch() {
        let (tillauth, mut account, setup) = for_test_enabled().await;

        // Spend one of the original codes first
        let spent = &setup.backup_codes[0];
        account
            .verify_two_factor(&tillauth, spent, Default::default())
            .await
            .unwrap();
        let old = setup.backup_codes[1].clone();

        let code = totp::totp(&setup.secret);
        let fresh = account
            .regenerate_backup_codes(&tillauth, &code, Default::default())
            .await
            .unwrap();

        assert_eq!(fresh.len(), 10);
        assert_eq!(account.two_factor_status().backup_codes_remaining, 10);

        // Codes from the replaced batch are dead
        assert!(!account
            .verify_two_factor(&tillauth, &old, Default::default())
            .await
            .unwrap()
            .is_valid());
    }

    #[async_std::test]
    async fn regenerate_raises_on_a_wrong_code() {
        let (tillauth, mut account, _) = for_test_enabled().await;

        assert_eq!(
            account
                .regenerate_backup_codes(&tillauth, WRONG_CODE, Default::default())
                .await,
            Err(Error::InvalidCredentials)
        );
        assert_eq!(account.two_factor_status().backup_codes_remaining, 10);
    }

    #[async_std::test]
    async fn verification_fails_fast_before_enable() {
        let (tillauth, mut account) = for_test_account().await;
        account.setup_two_factor(&tillauth, None).await.unwrap();

        assert_eq!(
            account
                .verify_two_factor(&tillauth, WRONG_CODE, Default::default())
                .await,
            Err(Error::TwoFactorNotEnabled)
        );

        // Failing the precondition leaves no audit record behind
        let attempts = tillauth
            .database
            .find_attempts(&account.id, 100)
            .await
            .unwrap();
        assert!(attempts.is_empty());
    }

    async fn attempts(tillauth: &Tillauth, account_id: &str) -> usize {
        tillauth
            .database
            .find_attempts(account_id, 100)
            .await
            .unwrap()
            .len()
    }

    #[async_std::test]
    async fn every_attempt_is_audited_exactly_once() {
        let (tillauth, mut account) = for_test_account().await;
        let setup = account.setup_two_factor(&tillauth, None).await.unwrap();

        assert_eq!(attempts(&tillauth, &account.id).await, 0);

        account
            .enable_two_factor(&tillauth, WRONG_CODE, Default::default())
            .await
            .unwrap();
        assert_eq!(attempts(&tillauth, &account.id).await, 1);

        let code = totp::totp(&setup.secret);
        account
            .enable_two_factor(&tillauth, &code, Default::default())
            .await
            .unwrap();
        assert_eq!(attempts(&tillauth, &account.id).await, 2);

        account
            .verify_two_factor(&tillauth, &code, Default::default())
            .await
            .unwrap();
        assert_eq!(attempts(&tillauth, &account.id).await, 3);

        account
            .verify_two_factor(&tillauth, WRONG_CODE, Default::default())
            .await
            .unwrap();
        assert_eq!(attempts(&tillauth, &account.id).await, 4);

        // Pure reads stay silent
        account.two_factor_status();
        account.requires_two_factor();
        assert_eq!(attempts(&tillauth, &account.id).await, 4);

        account
            .disable_two_factor(&tillauth, WRONG_CODE, Default::default())
            .await
            .unwrap();
        assert_eq!(attempts(&tillauth, &account.id).await, 5);

        let code = totp::totp(&setup.secret);
        account
            .disable_two_factor(&tillauth, &code, Default::default())
            .await
            .unwrap();
        assert_eq!(attempts(&tillauth, &account.id).await, 6);
    }

    #[async_std::test]
    async fn emergency_disable_always_leaves_a_trail() {
        let (tillauth, mut account, _) = for_test_enabled().await;
        let admin = Account::new(&tillauth, "admin@example.com".into(), AccountRole::Admin)
            .await
            .unwrap();

        account
            .emergency_disable_two_factor(&tillauth, &admin)
            .await
            .unwrap();

        assert!(!account.two_factor_status().enabled);

        let attempts = tillauth
            .database
            .find_attempts(&account.id, 100)
            .await
            .unwrap();
        let attempt = attempts
            .iter()
            .find(|attempt| attempt.performed_by.is_some())
            .unwrap();

        assert_eq!(attempt.method, AttemptMethod::Recovery);
        assert_eq!(attempt.reason.as_deref(), Some("emergency_disable_2fa"));
        assert_eq!(attempt.performed_by.as_deref(), Some(admin.id.as_str()));
    }
}
