//! Unattended autofish loop and its attempt log

pub mod log;
pub mod runner;

pub use log::{AttemptLog, AttemptRecord};
pub use runner::{AutofishLoop, AutofishStatus};
