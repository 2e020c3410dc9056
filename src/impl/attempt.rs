use iso8601_timestamp::Timestamp;

use crate::models::{AttemptMethod, AttemptOutcome, RequestMetadata, TwoFactorAttempt};

impl TwoFactorAttempt {
    /// Record a successful attempt
    pub fn success(
        account_id: &str,
        method: AttemptMethod,
        metadata: RequestMetadata,
    ) -> TwoFactorAttempt {
        TwoFactorAttempt {
            id: ulid::Ulid::new().to_string(),
            account_id: account_id.to_string(),
            outcome: AttemptOutcome::Success,
            method,
            metadata,
            timestamp: Timestamp::now_utc(),
            reason: None,
            performed_by: None,
        }
    }

    /// Record a failed attempt
    pub fn failure(
        account_id: &str,
        method: AttemptMethod,
        metadata: RequestMetadata,
        reason: &str,
    ) -> TwoFactorAttempt {
        TwoFactorAttempt {
            id: ulid::Ulid::new().to_string(),
            account_id: account_id.to_string(),
            outcome: AttemptOutcome::Failure,
            method,
            metadata,
            timestamp: Timestamp::now_utc(),
            reason: Some(reason.to_string()),
            performed_by: None,
        }
    }

    /// Record a break-glass disable attributed to an administrator
    pub fn emergency_disable(account_id: &str, acting_admin: &str) -> TwoFactorAttempt {
        TwoFactorAttempt {
            id: ulid::Ulid::new().to_string(),
            account_id: account_id.to_string(),
            outcome: AttemptOutcome::Success,
            method: AttemptMethod::Recovery,
            metadata: RequestMetadata::default(),
            timestamp: Timestamp::now_utc(),
            reason: Some("emergency_disable_2fa".to_string()),
            performed_by: Some(acting_admin.to_string()),
        }
    }
}
