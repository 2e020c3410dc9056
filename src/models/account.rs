use super::TwoFactorCredential;

/// Staff role on a Tillpoint business
#[derive(Default, Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    /// Business owner
    Owner,
    /// Administrator
    Admin,
    /// Ordinary staff member
    #[default]
    Staff,
}

/// Account model
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Account {
    /// Unique Id
    #[serde(rename = "_id")]
    pub id: String,

    /// User's email
    pub email: String,

    /// Role on the business
    #[serde(default)]
    pub role: AccountRole,

    /// Two-factor credential
    #[serde(skip_serializing_if = "TwoFactorCredential::is_not_setup", default)]
    pub two_factor: TwoFactorCredential,
}
