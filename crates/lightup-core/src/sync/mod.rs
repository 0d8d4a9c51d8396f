//! LightUpPi alarm synchronisation.
//!
//! Request flow: a verb is dispatched by the [`SyncOrchestrator`], the
//! [`Connectivity`] gate is checked, the [`LightUpPiClient`] performs the GET
//! and decodes the response, and the owning context applies the result to
//! local storage (for a pull, through the reconciliation engine).

mod client;
pub mod codec;
mod connectivity;
mod monitor;
mod orchestrator;
mod outcome;
pub mod reconcile;
mod transport;

use thiserror::Error;

pub use client::LightUpPiClient;
pub use codec::{AlarmBatch, DecodeDefaults, EditAck};
pub use connectivity::{Connectivity, RouteProbe, StaticConnectivity};
pub use monitor::{check_server, ServerMonitor};
pub use orchestrator::{Completion, SyncOrchestrator, SyncRequest, TaskResult, UpdateOptions};
pub use outcome::{OutcomeSink, SyncKind, SyncOutcome};
pub use reconcile::{ReconcileGate, ReconcileReport};
pub use transport::HttpTransport;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No network connection")]
    NoConnectivity,
    #[error("LightUpPi request failed: {0}")]
    Network(String),
    #[error("LightUpPi server responded with HTTP {0}")]
    Http(u16),
    #[error("Invalid LightUpPi response: {0}")]
    Decode(String),
    #[error("LightUpPi server rejected the request")]
    ServerRejected,
    #[error("LightUpPi server address is not configured")]
    NotConfigured,
    #[error("Invalid LightUpPi configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Alarm has no LightUpPi server ID")]
    MissingServerId,
    #[error("A LightUpPi sync is already in progress")]
    Busy,
    #[error(transparent)]
    Store(#[from] crate::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
