#[macro_use]
extern crate serde;
#[macro_use]
extern crate async_trait;
#[macro_use]
extern crate nanoid;
#[macro_use]
extern crate log;

#[cfg(feature = "database-mongodb")]
#[macro_use]
extern crate bson;

mod result;
pub use result::*;

pub mod config;
pub mod database;
pub mod r#impl;
pub mod models;
pub mod totp;
pub mod util;


pub use config::Config;
pub use database::{Database, Migration};

use models::TwoFactorAttempt;

/// Tillauth state
#[derive(Default, Clone)]
pub struct Tillauth {
    pub config: Config,
    pub database: Database,
}

impl Tillauth {
    /// Record a two-factor attempt in the audit log
    ///
    /// The verification outcome is already decided by the time an attempt
    /// is recorded; a failed audit write is logged and swallowed rather
    /// than allowed to overturn it.
    pub async fn log_attempt(&self, attempt: TwoFactorAttempt) {
        if let Err(err) = self.database.save_attempt(&attempt).await {
            error!(
                "Failed to record a two-factor attempt for account {}: {:?}",
                attempt.account_id, err
            );
        }
    }
}
