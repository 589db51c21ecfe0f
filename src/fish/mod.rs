//! Fishing service types and the remote service boundary

pub mod api;
pub mod base;
pub mod service;

pub use api::{AutofishResponse, CastResponse, CatchResponse, RefreshData};
pub use base::{CompletedChallenge, DailyStats, Fish, Rarity};
pub use service::{FishingService, HttpFishingService};
