use crate::error::ConfigError;
use crate::visibility::PINNED_CATEGORY_TITLE;
use serde::{Deserialize, Serialize};

/// Application settings passed explicitly to the composition root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Title of the synthetic category that holds pinned trackers
    pub pinned_category_title: String,
    /// Whether the onboarding pages were dismissed
    pub has_seen_onboarding: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            pinned_category_title: PINNED_CATEGORY_TITLE.to_string(),
            has_seen_onboarding: false,
        }
    }
}

impl TrackerConfig {
    /// Parse a JSON config. Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
