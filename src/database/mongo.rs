use bson::{to_document, Document};
use futures::stream::TryStreamExt;
use iso8601_timestamp::Timestamp;
use mongodb::options::UpdateOptions;
use std::ops::Deref;

use crate::{
    models::{Account, TwoFactorAttempt, TwoFactorCredential},
    Error, Result, Success,
};

use super::{definition::AbstractDatabase, Migration};

#[derive(Clone)]
pub struct MongoDb(pub mongodb::Database);

impl Deref for MongoDb {
    type Target = mongodb::Database;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl AbstractDatabase for MongoDb {
    /// Run a database migration
    async fn run_migration(&self, migration: Migration) -> Success {
        match migration {
            #[cfg(debug_assertions)]
            Migration::WipeAll => {
                // Drop the entire database
                self.drop().await.unwrap();
            }
            Migration::M2025_08_01EnsureUpToSpec => {
                if self
                    .collection::<Document>("two_factor_attempts")
                    .list_index_names()
                    .await
                    .unwrap_or_default()
                    .contains(&"account_attempts".to_owned())
                {
                    return Ok(());
                }

                // Make sure all collections exist
                let list = self.list_collection_names().await.unwrap();
                let collections = ["accounts", "two_factor_attempts"];

                for name in collections {
                    if !list.contains(&name.to_string()) {
                        self.create_collection(name).await.unwrap();
                    }
                }

                // Setup index for `accounts`
                self.run_command(doc! {
                    "createIndexes": "accounts",
                    "indexes": [
                        {
                            "key": {
                                "email": 1
                            },
                            "name": "email",
                            "unique": true,
                            "collation": {
                                "locale": "en",
                                "strength": 2
                            }
                        }
                    ]
                })
                .await
                .unwrap();

                // Setup index for `two_factor_attempts`
                self.run_command(doc! {
                    "createIndexes": "two_factor_attempts",
                    "indexes": [
                        {
                            "key": {
                                "account_id": 1,
                                "timestamp": -1
                            },
                            "name": "account_attempts"
                        }
                    ]
                })
                .await
                .unwrap();
            }
        }

        Ok(())
    }

    /// Find account by id
    async fn find_account(&self, id: &str) -> Result<Account> {
        self.collection("accounts")
            .find_one(doc! {
                "_id": id
            })
            .await
            .map_err(|_| Error::DatabaseError {
                operation: "find_one",
                with: "account",
            })?
            .ok_or(Error::UnknownUser)
    }

    /// Save account
    async fn save_account(&self, account: &Account) -> Success {
        self.collection::<Account>("accounts")
            .update_one(
                doc! {
                    "_id": &account.id
                },
                doc! {
                    "$set": to_document(account).map_err(|_| Error::DatabaseError {
                        operation: "to_document",
                        with: "account",
                    })?
                },
            )
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await
            .map_err(|_| Error::DatabaseError {
                operation: "upsert_one",
                with: "account",
            })
            .map(|_| ())
    }

    /// Replace the two-factor credential embedded in an account
    async fn update_two_factor(
        &self,
        account_id: &str,
        credential: &TwoFactorCredential,
    ) -> Success {
        self.collection::<Account>("accounts")
            .update_one(
                doc! {
                    "_id": account_id
                },
                doc! {
                    "$set": {
                        "two_factor": to_document(credential).map_err(|_| Error::DatabaseError {
                            operation: "to_document",
                            with: "credential",
                        })?
                    }
                },
            )
            .await
            .map_err(|_| Error::DatabaseError {
                operation: "update_one",
                with: "account",
            })
            .map(|_| ())
    }

    /// Stamp the credential's last use without touching anything else
    async fn touch_two_factor(&self, account_id: &str, when: Timestamp) -> Success {
        self.collection::<Account>("accounts")
            .update_one(
                doc! {
                    "_id": account_id,
                    "two_factor.status": "Enabled"
                },
                doc! {
                    "$set": {
                        "two_factor.last_used": when.format().to_string()
                    }
                },
            )
            .await
            .map_err(|_| Error::DatabaseError {
                operation: "update_one",
                with: "account",
            })
            .map(|_| ())
    }

    /// Atomically spend a backup code
    ///
    /// The filter requires the code to still be present, so of two racing
    /// logins only the one whose update matched has spent it.
    async fn consume_backup_code(
        &self,
        account_id: &str,
        code: &str,
        when: Timestamp,
    ) -> Result<bool> {
        self.collection::<Account>("accounts")
            .update_one(
                doc! {
                    "_id": account_id,
                    "two_factor.status": "Enabled",
                    "two_factor.backup_codes": code
                },
                doc! {
                    "$pull": {
                        "two_factor.backup_codes": code
                    },
                    "$set": {
                        "two_factor.last_used": when.format().to_string()
                    }
                },
            )
            .await
            .map_err(|_| Error::DatabaseError {
                operation: "update_one",
                with: "account",
            })
            .map(|result| result.modified_count == 1)
    }

    /// Append an attempt to the audit log
    async fn save_attempt(&self, attempt: &TwoFactorAttempt) -> Success {
        self.collection::<TwoFactorAttempt>("two_factor_attempts")
            .insert_one(attempt)
            .await
            .map_err(|_| Error::DatabaseError {
                operation: "insert_one",
                with: "two_factor_attempt",
            })
            .map(|_| ())
    }

    /// Find recent attempts for an account, newest first
    async fn find_attempts(&self, account_id: &str, limit: i64) -> Result<Vec<TwoFactorAttempt>> {
        self.collection::<TwoFactorAttempt>("two_factor_attempts")
            .find(doc! {
                "account_id": account_id
            })
            .sort(doc! {
                "timestamp": -1
            })
            .limit(limit)
            .await
            .map_err(|_| Error::DatabaseError {
                operation: "find",
                with: "two_factor_attempts",
            })?
            .try_collect()
            .await
            .map_err(|_| Error::DatabaseError {
                operation: "collect",
                with: "two_factor_attempts",
            })
    }
}
