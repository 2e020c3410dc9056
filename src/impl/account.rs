use crate::{
    models::{Account, AccountRole},
    Result, Tillauth,
};

impl Account {
    /// Create a new account
    pub async fn new(tillauth: &Tillauth, email: String, role: AccountRole) -> Result<Account> {
        let account = Account {
            id: ulid::Ulid::new().to_string(),

            email,
            role,

            two_factor: Default::default(),
        };

        tillauth.database.save_account(&account).await?;

        Ok(account)
    }

    /// Whether platform policy requires this account to enroll
    ///
    /// Only elevated administrative roles are required to keep two-factor
    /// enabled; ordinary staff may enroll but never have to.
    pub fn requires_two_factor(&self) -> bool {
        matches!(self.role, AccountRole::Owner | AccountRole::Admin)
    }
}
