//! Application settings model

use serde::{Deserialize, Serialize};

use super::DEFAULT_ALERT_SOUND;

/// Persisted application settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// LightUpPi server address as `host[:port]`
    pub lightuppi_server: String,
    /// Default alarm sound for alarms created from server data
    pub default_alert_sound: Option<String>,
}

impl Settings {
    /// The configured default alarm sound, or the platform fallback URI
    #[must_use]
    pub fn alert_sound(&self) -> &str {
        self.default_alert_sound
            .as_deref()
            .unwrap_or(DEFAULT_ALERT_SOUND)
    }
}
