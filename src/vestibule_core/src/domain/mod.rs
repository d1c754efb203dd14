pub mod account;
pub mod email;
pub mod failure;
pub mod login_flow;
pub mod mfa;
pub mod password;
pub mod session;
pub mod token;
