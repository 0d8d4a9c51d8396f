//! Alarm model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DaysOfWeek;
use crate::error::{Error, Result};
use crate::util::unix_timestamp_millis;

/// Alert sound used when no platform default alarm sound is configured.
pub const DEFAULT_ALERT_SOUND: &str = "content://settings/system/alarm_alert";

/// Identity of an alarm in local storage, assigned on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(i64);

impl AlarmId {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AlarmId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Identity of an alarm on the LightUpPi server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(i64);

impl RemoteId {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An alarm as stored on the phone.
///
/// `remote_id` is `None` until the alarm has been added to the LightUpPi
/// server. `alert`, `vibrate` and `delete_after_use` only exist locally and
/// are never taken from server data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    /// Local storage identity, `None` before the first insert
    pub id: Option<AlarmId>,
    /// Server identity, `None` for local-only alarms
    pub remote_id: Option<RemoteId>,
    pub hour: u8,
    pub minute: u8,
    pub days: DaysOfWeek,
    pub enabled: bool,
    pub label: String,
    /// Alert sound URI
    pub alert: String,
    pub vibrate: bool,
    pub delete_after_use: bool,
    /// Last edit marker (Unix ms); the server value wins after a sync
    pub timestamp: i64,
}

impl Alarm {
    /// Create a new local-only alarm at the given time of day
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        validate_time(i64::from(hour), i64::from(minute))?;
        Ok(Self {
            id: None,
            remote_id: None,
            hour,
            minute,
            days: DaysOfWeek::empty(),
            enabled: true,
            label: String::new(),
            alert: DEFAULT_ALERT_SOUND.to_string(),
            vibrate: true,
            delete_after_use: false,
            timestamp: unix_timestamp_millis(),
        })
    }

    /// Whether the alarm is known to the LightUpPi server
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Set the time of day, validating both fields
    pub fn set_time(&mut self, hour: u8, minute: u8) -> Result<()> {
        validate_time(i64::from(hour), i64::from(minute))?;
        self.hour = hour;
        self.minute = minute;
        Ok(())
    }

    /// Copy the server-authoritative fields of `server` onto this alarm.
    ///
    /// Keeps this alarm's local identity, alert sound, vibrate and
    /// delete-after-use flags; everything else, including `remote_id` and
    /// `timestamp`, comes from `server`.
    #[must_use]
    pub fn merged_from_server(&self, server: &Self) -> Self {
        Self {
            id: self.id,
            alert: self.alert.clone(),
            vibrate: self.vibrate,
            delete_after_use: self.delete_after_use,
            ..server.clone()
        }
    }

    /// Time of day formatted as `HH:MM`
    #[must_use]
    pub fn time_label(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

/// Check hour and minute against their natural ranges
pub fn validate_time(hour: i64, minute: i64) -> Result<()> {
    if !(0..=23).contains(&hour) {
        return Err(Error::InvalidInput(format!(
            "hour must be between 0 and 23, got {hour}"
        )));
    }
    if !(0..=59).contains(&minute) {
        return Err(Error::InvalidInput(format!(
            "minute must be between 0 and 59, got {minute}"
        )));
    }
    Ok(())
}
