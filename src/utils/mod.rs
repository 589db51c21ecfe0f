//! Shared helpers

pub mod action_lock;
pub mod path;

pub use action_lock::ActionLock;
