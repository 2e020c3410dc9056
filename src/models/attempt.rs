use iso8601_timestamp::Timestamp;

/// How a verification attempt was satisfied
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AttemptMethod {
    Totp,
    BackupCode,
    Recovery,
}

/// Outcome of a verification attempt
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// Request metadata captured alongside an attempt
#[derive(Default, Debug, Serialize, Deserialize, Clone)]
pub struct RequestMetadata {
    /// Network origin of the request
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ip: Option<String>,
    /// Client string reported by the caller
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_agent: Option<String>,
}

/// Record of a single two-factor verification attempt
///
/// Appended to the audit log once per attempt, never mutated or deleted.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TwoFactorAttempt {
    /// Unique Id
    #[serde(rename = "_id")]
    pub id: String,

    /// Account the attempt was made against
    pub account_id: String,

    /// Outcome of the attempt
    pub outcome: AttemptOutcome,

    /// Method the attempt used
    pub method: AttemptMethod,

    /// Request metadata
    #[serde(default)]
    pub metadata: RequestMetadata,

    /// Time of the attempt
    pub timestamp: Timestamp,

    /// Failure reason or action tag
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,

    /// Administrator the action is attributed to, for break-glass actions
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub performed_by: Option<String>,
}
