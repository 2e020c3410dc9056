use iso8601_timestamp::Timestamp;

use crate::{
    models::{Account, TwoFactorAttempt, TwoFactorCredential},
    Error, Result, Success,
};

use futures::lock::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::{definition::AbstractDatabase, Migration};

#[derive(Default, Clone)]
pub struct DummyDb {
    pub accounts: Arc<Mutex<HashMap<String, Account>>>,
    pub attempts: Arc<Mutex<Vec<TwoFactorAttempt>>>,
}

#[async_trait]
impl AbstractDatabase for DummyDb {
    /// Run a database migration
    async fn run_migration(&self, migration: Migration) -> Success {
        println!("skip migration {:?}", migration);
        Ok(())
    }

    /// Find account by id
    async fn find_account(&self, id: &str) -> Result<Account> {
        let accounts = self.accounts.lock().await;
        accounts.get(id).cloned().ok_or(Error::UnknownUser)
    }

    /// Save account
    async fn save_account(&self, account: &Account) -> Success {
        let mut accounts = self.accounts.lock().await;
        accounts.insert(account.id.to_string(), account.clone());
        Ok(())
    }

    /// Replace the two-factor credential embedded in an account
    async fn update_two_factor(
        &self,
        account_id: &str,
        credential: &TwoFactorCredential,
    ) -> Success {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.get_mut(account_id).ok_or(Error::UnknownUser)?;
        account.two_factor = credential.clone();
        Ok(())
    }

    /// Stamp the credential's last use without touching anything else
    async fn touch_two_factor(&self, account_id: &str, when: Timestamp) -> Success {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.get_mut(account_id).ok_or(Error::UnknownUser)?;

        if let TwoFactorCredential::Enabled { last_used, .. } = &mut account.two_factor {
            *last_used = Some(when);
        }

        Ok(())
    }

    /// Atomically spend a backup code
    ///
    /// Removal happens under a single lock over the account map, so two
    /// racing calls cannot both observe the code as present.
    async fn consume_backup_code(
        &self,
        account_id: &str,
        code: &str,
        when: Timestamp,
    ) -> Result<bool> {
        let mut accounts = self.accounts.lock().await;
        let account = match accounts.get_mut(account_id) {
            Some(account) => account,
            None => return Ok(false),
        };

        if let TwoFactorCredential::Enabled {
            backup_codes,
            last_used,
            ..
        } = &mut account.two_factor
        {
            if let Some(position) = backup_codes.iter().position(|candidate| candidate == code) {
                backup_codes.remove(position);
                *last_used = Some(when);
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Append an attempt to the audit log
    async fn save_attempt(&self, attempt: &TwoFactorAttempt) -> Success {
        let mut attempts = self.attempts.lock().await;
        attempts.push(attempt.clone());
        Ok(())
    }

    /// Find recent attempts for an account, newest first
    async fn find_attempts(&self, account_id: &str, limit: i64) -> Result<Vec<TwoFactorAttempt>> {
        let attempts = self.attempts.lock().await;
        let mut attempts: Vec<TwoFactorAttempt> = attempts
            .iter()
            .filter(|attempt| attempt.account_id == account_id)
            .cloned()
            .collect();

        attempts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        attempts.truncate(limit as usize);

        Ok(attempts)
    }
}
