use iso8601_timestamp::Timestamp;

use super::AttemptMethod;

/// Two-factor credential attached to an account
///
/// A credential only carries a secret in the `Pending` and `Enabled`
/// states, so an enabled credential without secret material cannot be
/// represented. Disabling is destructive: the secret and any remaining
/// backup codes are discarded and enrollment starts over from `setup`.
#[derive(Default, Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(tag = "status")]
pub enum TwoFactorCredential {
    /// Never set up
    #[default]
    NotSetup,
    /// Secret issued, waiting for the user to confirm their authenticator
    Pending {
        secret: String,
        backup_codes: Vec<String>,
        device_name: Option<String>,
        setup_at: Timestamp,
    },
    /// Active on the account
    Enabled {
        secret: String,
        backup_codes: Vec<String>,
        device_name: Option<String>,
        setup_at: Timestamp,
        enabled_at: Timestamp,
        last_used: Option<Timestamp>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        codes_regenerated_at: Option<Timestamp>,
    },
    /// Disabled until the account re-enrolls
    Disabled { disabled_at: Timestamp },
}

/// Material handed to the user once during setup
#[derive(Debug, Serialize, Deserialize)]
pub struct TwoFactorSetup {
    /// Base32 secret, as stored
    pub secret: String,
    /// Secret grouped in blocks of four for typing by hand
    pub manual_entry_key: String,
    /// otpauth:// URI rendered as a QR code by the caller
    pub provisioning_uri: String,
    /// Fresh single-use backup codes
    pub backup_codes: Vec<String>,
}

/// Result of a login-time code verification
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(tag = "result")]
pub enum TwoFactorVerification {
    /// The code matched
    Valid { method: AttemptMethod },
    /// Neither the TOTP value nor any backup code matched
    Invalid,
}

impl TwoFactorVerification {
    pub fn is_valid(&self) -> bool {
        matches!(self, TwoFactorVerification::Valid { .. })
    }
}

/// Snapshot of an account's two-factor state
#[derive(Debug, Serialize, Deserialize)]
pub struct TwoFactorStatus {
    pub enabled: bool,
    pub setup_at: Option<Timestamp>,
    pub last_used: Option<Timestamp>,
    pub backup_codes_remaining: usize,
    pub device_name: Option<String>,
}
