//! Wire types for the fishing service endpoints

use serde::{Deserialize, Serialize};

use super::base::{CompletedChallenge, DailyStats, Fish};

/// Response to a cast request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastResponse {
    pub session_id: String,
    /// Milliseconds until the fish bites
    pub wait_time: u64,
    /// Milliseconds the catch window stays open
    #[serde(default)]
    pub miss_timeout: Option<u64>,
    #[serde(default)]
    pub pity_triggered: bool,
    #[serde(default)]
    pub mercy_bonus: Option<serde_json::Value>,
    #[serde(default)]
    pub daily: Option<DailyStats>,
}

/// Response to a catch or miss-report request.
///
/// Hits and misses share one shape; the `success` flag decides which
/// fields are meaningful.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchResponse {
    pub success: bool,
    #[serde(default)]
    pub fish: Option<Fish>,
    #[serde(default)]
    pub catch_quality: Option<String>,
    #[serde(default)]
    pub fish_quantity: Option<u32>,
    #[serde(default)]
    pub reaction_time: Option<u64>,
    #[serde(default)]
    pub streak: Option<u32>,
    #[serde(default)]
    pub streak_bonus: Option<serde_json::Value>,
    #[serde(default)]
    pub pity_triggered: bool,
    #[serde(default)]
    pub challenges_completed: Vec<CompletedChallenge>,
    #[serde(default)]
    pub timing_window: Option<u64>,
    #[serde(default)]
    pub miss_streak: Option<u32>,
    #[serde(default)]
    pub mercy_bonus: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub daily: Option<DailyStats>,
}

/// Response to one server-side autofish cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutofishResponse {
    #[serde(default)]
    pub fish: Option<Fish>,
    pub success: bool,
    pub daily: DailyStats,
    #[serde(default)]
    pub challenges_completed: Vec<CompletedChallenge>,
}

/// Auxiliary data re-fetched by the autofish staleness refresh.
///
/// Each part is `None` when its fetch failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshData {
    pub info: Option<serde_json::Value>,
    pub rank: Option<serde_json::Value>,
    pub challenges: Option<serde_json::Value>,
}
