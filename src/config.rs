/// Tillauth configuration
#[derive(Serialize, Deserialize, Clone)]
pub struct Config {
    /// Issuer embedded in provisioning URIs
    ///
    /// Shown by authenticator apps next to the account label.
    pub issuer: String,

    /// Product name printed on the backup codes download
    pub product_name: String,

    /// Time steps checked either side of now when verifying a code
    ///
    /// The default of one step tolerates ±30 seconds of clock drift.
    pub verification_window: u64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            issuer: "Tillpoint".to_string(),
            product_name: "Tillpoint".to_string(),
            verification_window: 1,
        }
    }
}
