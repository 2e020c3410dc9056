mod account;
mod attempt;
mod credential;

pub use account::*;
pub use attempt::*;
pub use credential::*;
