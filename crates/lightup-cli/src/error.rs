use std::io;

use lightup_core::sync::SyncError;
use lightup_core::AlarmId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] lightup_core::Error),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("Invalid alarm ID '{0}'")]
    InvalidAlarmId(String),
    #[error("Alarm not found: {0}")]
    AlarmNotFound(AlarmId),
    #[error("Invalid server address '{0}'")]
    InvalidServerAddress(String),
    #[error(
        "LightUpPi server is not configured. Run `lightup config set-server <host[:port]>` or set LIGHTUPPI_SERVER."
    )]
    ServerNotConfigured,
    #[error("LightUpPi sync did not complete")]
    SyncIncomplete,
}
