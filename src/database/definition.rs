use iso8601_timestamp::Timestamp;

use crate::{
    models::{Account, TwoFactorAttempt, TwoFactorCredential},
    Result, Success,
};

use super::Migration;

#[async_trait]
pub trait AbstractDatabase: std::marker::Sync {
    /// Run a database migration
    async fn run_migration(&self, migration: Migration) -> Success;

    /// Find account by id
    async fn find_account(&self, id: &str) -> Result<Account>;

    /// Save account
    async fn save_account(&self, account: &Account) -> Success;

    /// Replace the two-factor credential embedded in an account
    ///
    /// Writes only the credential field, leaving the rest of the account
    /// document untouched.
    async fn update_two_factor(
        &self,
        account_id: &str,
        credential: &TwoFactorCredential,
    ) -> Success;

    /// Stamp the credential's last use without touching anything else
    async fn touch_two_factor(&self, account_id: &str, when: Timestamp) -> Success;

    /// Atomically spend a backup code
    ///
    /// Removes the code only if it is still present and stamps the
    /// credential's last use in the same update. Returns whether this
    /// caller spent the code; a concurrent login racing for the same code
    /// observes `false`.
    async fn consume_backup_code(
        &self,
        account_id: &str,
        code: &str,
        when: Timestamp,
    ) -> Result<bool>;

    /// Append an attempt to the audit log
    async fn save_attempt(&self, attempt: &TwoFactorAttempt) -> Success;

    /// Find recent attempts for an account, newest first
    async fn find_attempts(&self, account_id: &str, limit: i64) -> Result<Vec<TwoFactorAttempt>>;
}
