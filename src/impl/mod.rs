mod account;
mod attempt;
mod credential;
mod two_factor;
