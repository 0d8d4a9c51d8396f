//! LightUpPi server configuration.
//!
//! Every request goes to `http://<address>/LightUpPi/<endpoint>?<params>`,
//! where `<address>` is the `host[:port]` saved in the app settings.

use std::time::Duration;

use reqwest::Url;

use crate::models::Settings;
use crate::util::normalize_text_option;

/// Path segment under which the LightUpPi web app is served.
pub const LIGHTUPPI_APP_PATH: &str = "LightUpPi";

const CONNECT_TIMEOUT_MS: u64 = 15_000;
const READ_TIMEOUT_MS: u64 = 10_000;
const SERVER_CHECK_INTERVAL_SECS: u64 = 30;

/// Address of the LightUpPi server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    address: Option<String>,
}

impl ServerConfig {
    /// Create a config from a raw `host[:port]` string
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: normalize_server_address(address.into()),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.lightuppi_server.clone())
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub const fn is_configured(&self) -> bool {
        self.address.is_some()
    }

    /// Build the URL of a LightUpPi endpoint with percent-encoded query parameters.
    pub fn endpoint_url(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Url, String> {
        let address = self
            .address
            .as_deref()
            .ok_or_else(|| "LightUpPi server address is not configured".to_string())?;

        let mut url = Url::parse(&format!("http://{address}/"))
            .map_err(|error| format!("invalid LightUpPi server address '{address}': {error}"))?;
        url.path_segments_mut()
            .map_err(|()| format!("LightUpPi server address '{address}' cannot hold a path"))?
            .pop_if_empty()
            .extend([LIGHTUPPI_APP_PATH, endpoint]);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }
        Ok(url)
    }
}

/// Normalize a server address to bare `host[:port]`.
///
/// Surrounding whitespace, a leading `http://`/`https://` and trailing
/// slashes are removed. Returns `None` when nothing remains.
pub fn normalize_server_address(raw: String) -> Option<String> {
    let value = normalize_text_option(Some(raw))?;
    let value = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"))
        .unwrap_or(&value)
        .trim_end_matches('/');
    normalize_text_option(Some(value.to_string()))
}

/// HTTP timeouts applied to every LightUpPi request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS),
            read_timeout: Duration::from_millis(READ_TIMEOUT_MS),
        }
    }
}

/// Schedule of the background server liveness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Delay between the end of one ping and the start of the next.
    /// The first ping runs immediately.
    pub interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(SERVER_CHECK_INTERVAL_SECS),
        }
    }
}
