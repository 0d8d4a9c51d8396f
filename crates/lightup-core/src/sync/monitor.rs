//! Background LightUpPi liveness poller.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::client::LightUpPiClient;
use super::connectivity::Connectivity;
use crate::config::MonitorConfig;
use crate::state::ServerStatus;
use crate::ui::UiHandle;

/// Ping the server once and classify the result
pub async fn check_server(client: &LightUpPiClient) -> ServerStatus {
    match client.ping().await {
        Ok(()) => ServerStatus::Online,
        Err(error) => {
            debug!(%error, "LightUpPi ping failed");
            ServerStatus::Offline
        }
    }
}

/// Owned handle to the recurring server check.
///
/// The screen that shows server status owns this and calls [`Self::stop`]
/// when it is hidden. Dropping the monitor stops it too.
pub struct ServerMonitor {
    client: Arc<LightUpPiClient>,
    connectivity: Arc<dyn Connectivity>,
    ui: UiHandle,
    config: MonitorConfig,
    task: Option<JoinHandle<()>>,
}

impl ServerMonitor {
    pub fn new(
        client: Arc<LightUpPiClient>,
        connectivity: Arc<dyn Connectivity>,
        ui: UiHandle,
    ) -> Self {
        Self::with_config(client, connectivity, ui, MonitorConfig::default())
    }

    pub fn with_config(
        client: Arc<LightUpPiClient>,
        connectivity: Arc<dyn Connectivity>,
        ui: UiHandle,
        config: MonitorConfig,
    ) -> Self {
        Self {
            client,
            connectivity,
            ui,
            config,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start pinging the server, first tick immediately.
    ///
    /// Ticks run with a fixed delay: the next ping starts `interval` after
    /// the previous one has finished, so a slow ping never overlaps the next.
    ///
    /// Each tick posts `on_online` (HTTP 200) or `on_offline` (anything
    /// else) to the UI context. If the poller is already running, or there
    /// is no network, `on_offline` is posted once and nothing is scheduled.
    /// Must be called from within a tokio runtime.
    pub fn start<F, G>(&mut self, on_online: F, on_offline: G)
    where
        F: Fn() + Send + Sync + 'static,
        G: Fn() + Send + Sync + 'static,
    {
        let on_offline = Arc::new(on_offline);

        if self.is_running() || !self.connectivity.is_connected() {
            debug!(
                running = self.is_running(),
                "Server check not started; reporting offline"
            );
            let on_offline = Arc::clone(&on_offline);
            self.ui.post(move || on_offline());
            return;
        }

        let on_online = Arc::new(on_online);
        let client = Arc::clone(&self.client);
        let ui = self.ui.clone();
        let period = self.config.interval;

        info!(?period, "Starting LightUpPi server check");
        self.task = Some(tokio::spawn(async move {
            loop {
                let status = check_server(&client).await;
                debug!(%status, "LightUpPi server check");
                let posted = match status {
                    ServerStatus::Online => {
                        let callback = Arc::clone(&on_online);
                        ui.post(move || callback())
                    }
                    ServerStatus::Offline => {
                        let callback = Arc::clone(&on_offline);
                        ui.post(move || callback())
                    }
                };
                if !posted {
                    debug!("UI context closed; stopping server check");
                    break;
                }
                tokio::time::sleep(period).await;
            }
        }));
    }

    /// Cancel the recurring check. Calling this when not running does nothing.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Stopped LightUpPi server check");
        }
    }
}

impl Drop for ServerMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
