#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Error {
    DatabaseError {
        operation: &'static str,
        with: &'static str,
    },
    OperationFailed,

    UnknownUser,
    InvalidCredentials,

    TwoFactorNotSetup,
    TwoFactorNotEnabled,
    TwoFactorAlreadyEnabled,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
pub type Success = Result<()>;
