//! Shared cross-platform state types.

use std::fmt;

/// Reachability of the LightUpPi server as last reported by the liveness poller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerStatus {
    Online,
    Offline,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => f.write_str("LightUpPi ONLINE"),
            Self::Offline => f.write_str("LightUpPi OFFLINE"),
        }
    }
}
