//! User-visible results of sync operations.

use std::fmt;

use super::reconcile::ReconcileReport;
use super::SyncError;

/// Operation kind of a dispatched sync unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    Get,
    PushToPhone,
    Add,
    Edit,
    Delete,
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "get",
            Self::PushToPhone => "push-to-phone",
            Self::Add => "add",
            Self::Edit => "edit",
            Self::Delete => "delete",
        })
    }
}

/// Terminal outcome of one dispatched sync unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    NoConnection,
    /// HTTP 500 from the server
    ServerError,
    /// Any other non-200 status
    UnexpectedResponse(u16),
    NotConfigured,
    /// Configured address cannot form a request URL
    InvalidServerAddress,
    Busy,
    AlreadyOnServer,
    NoServerId,
    Refreshed,
    PushedToPhone(ReconcileReport),
    Added,
    Edited,
    Deleted,
    Failed(SyncKind),
}

impl SyncOutcome {
    /// Map a failed unit to its outcome.
    ///
    /// Connectivity and HTTP status failures get their own messages; every
    /// other failure reads as a failure of `kind`.
    pub const fn from_error(kind: SyncKind, error: &SyncError) -> Self {
        match error {
            SyncError::NoConnectivity => Self::NoConnection,
            SyncError::Http(500) => Self::ServerError,
            SyncError::Http(status) => Self::UnexpectedResponse(*status),
            SyncError::NotConfigured => Self::NotConfigured,
            SyncError::InvalidConfiguration(_) => Self::InvalidServerAddress,
            SyncError::MissingServerId => Self::NoServerId,
            SyncError::Busy => Self::Busy,
            SyncError::Network(_)
            | SyncError::Decode(_)
            | SyncError::ServerRejected
            | SyncError::Store(_) => Self::Failed(kind),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Refreshed | Self::PushedToPhone(_) | Self::Added | Self::Edited | Self::Deleted
        )
    }

    pub fn message(&self) -> String {
        match self {
            Self::NoConnection => "No network connection available".to_string(),
            Self::ServerError => "LightUpPi server error (HTTP 500)".to_string(),
            Self::UnexpectedResponse(status) => {
                format!("Unexpected LightUpPi server response: HTTP {status}")
            }
            Self::NotConfigured => "LightUpPi server address is not configured".to_string(),
            Self::InvalidServerAddress => "LightUpPi server address is invalid".to_string(),
            Self::Busy => "A LightUpPi sync is already in progress".to_string(),
            Self::AlreadyOnServer => "Alarm already exists on the LightUpPi server".to_string(),
            Self::NoServerId => "Alarm has no LightUpPi server ID".to_string(),
            Self::Refreshed => "Alarm refreshed from LightUpPi".to_string(),
            Self::PushedToPhone(report) if report.skipped > 0 => format!(
                "Alarms synced from LightUpPi ({report}); {} unreadable record(s) ignored",
                report.skipped
            ),
            Self::PushedToPhone(report) => format!("Alarms synced from LightUpPi ({report})"),
            Self::Added => "Alarm added to LightUpPi".to_string(),
            Self::Edited => "Alarm updated on LightUpPi".to_string(),
            Self::Deleted => "Alarm deleted from LightUpPi".to_string(),
            Self::Failed(SyncKind::Get | SyncKind::PushToPhone) => {
                "Could not sync alarms from LightUpPi".to_string()
            }
            Self::Failed(SyncKind::Add) => "Could not add alarm to LightUpPi".to_string(),
            Self::Failed(SyncKind::Edit) => "Could not update alarm on LightUpPi".to_string(),
            Self::Failed(SyncKind::Delete) => {
                "Could not delete alarm from LightUpPi".to_string()
            }
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Receiver of progress and outcome notifications, driven from the owning context
pub trait OutcomeSink {
    /// A unit has been dispatched and its network phase is starting
    fn progress_started(&self, kind: SyncKind);

    /// The unit's network phase has ended, successfully or not
    fn progress_finished(&self, kind: SyncKind);

    fn report(&self, kind: SyncKind, outcome: &SyncOutcome);
}
