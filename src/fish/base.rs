//! Base types shared by the fishing service responses

use serde::{Deserialize, Serialize};

/// Fish rarity as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    #[serde(other)]
    Unknown,
}

impl Rarity {
    /// Get display value
    pub fn value(&self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
            Rarity::Unknown => "Unknown",
        }
    }
}

impl Default for Rarity {
    fn default() -> Self {
        Rarity::Unknown
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Fish descriptor carried by catch and autofish responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fish {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl Fish {
    /// Create a new fish
    pub fn new(id: impl Into<String>, name: impl Into<String>, rarity: Rarity) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rarity,
            emoji: None,
        }
    }
}

impl std::fmt::Display for Fish {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.rarity)
    }
}

/// Server-side daily autofish quota mirror
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    #[serde(default)]
    pub used: i64,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub remaining: i64,
}

impl DailyStats {
    /// Quota with `remaining` derived from `used` and `limit`
    pub fn new(used: i64, limit: i64) -> Self {
        Self {
            used,
            limit,
            remaining: limit - used,
        }
    }

    /// True when the server says nothing is left for today
    pub fn exhausted(&self) -> bool {
        self.remaining <= 0
    }
}

/// A challenge the server marked as completed by the last attempt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletedChallenge {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub reward: Option<serde_json::Value>,
}
