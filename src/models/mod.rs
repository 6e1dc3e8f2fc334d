pub mod account;
pub mod recovery;
pub mod signup;
pub mod throttle;
