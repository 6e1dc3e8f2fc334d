pub mod lifecycle;
pub mod recovery;
pub mod throttle;
