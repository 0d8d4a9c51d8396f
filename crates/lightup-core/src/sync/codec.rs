//! Alarm wire codec.
//!
//! Outbound requests carry alarm fields as query parameters; inbound
//! responses are JSON objects. Local-only fields (`alert`, `vibrate`,
//! `delete_after_use`) never travel over the wire and are filled from
//! [`DecodeDefaults`] when a server record becomes a local alarm.

use chrono::Weekday;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{SyncError, SyncResult};
use crate::models::{validate_time, Alarm, DaysOfWeek, RemoteId, Settings, WEEK};

/// Local-only values assigned to alarms that arrive from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeDefaults {
    pub alert_sound: String,
}

impl DecodeDefaults {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            alert_sound: settings.alert_sound().to_string(),
        }
    }
}

impl Default for DecodeDefaults {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Alarms decoded from a bulk pull
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmBatch {
    pub alarms: Vec<Alarm>,
    /// Records that could not be decoded and were left out
    pub skipped: usize,
}

/// Server acknowledgement of an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditAck {
    pub remote_id: RemoteId,
    pub timestamp: i64,
}

/// Query parameter name of a weekday flag
pub const fn weekday_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

fn alarm_fields(alarm: &Alarm) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("hour", alarm.hour.to_string()),
        ("minute", alarm.minute.to_string()),
    ];
    params.extend(
        WEEK.iter()
            .map(|day| (weekday_key(*day), alarm.days.contains(*day).to_string())),
    );
    params.push(("enabled", alarm.enabled.to_string()));
    params.push(("label", alarm.label.clone()));
    params
}

/// Query parameters of an `addAlarm` request
pub fn encode_add(alarm: &Alarm) -> Vec<(&'static str, String)> {
    let mut params = alarm_fields(alarm);
    params.push(("timestamp", alarm.timestamp.to_string()));
    params
}

/// Query parameters of an `editAlarm` request; the alarm must carry a server ID
pub fn encode_edit(alarm: &Alarm) -> SyncResult<Vec<(&'static str, String)>> {
    let remote_id = alarm.remote_id.ok_or(SyncError::MissingServerId)?;
    let mut params = vec![("id", remote_id.to_string())];
    params.extend(alarm_fields(alarm));
    Ok(params)
}

#[derive(Debug, Deserialize)]
struct WireAlarm {
    id: i64,
    hour: i64,
    minute: i64,
    enabled: bool,
    monday: bool,
    tuesday: bool,
    wednesday: bool,
    thursday: bool,
    friday: bool,
    saturday: bool,
    sunday: bool,
    label: String,
    timestamp: i64,
}

impl WireAlarm {
    fn into_alarm(self, defaults: &DecodeDefaults) -> SyncResult<Alarm> {
        validate_time(self.hour, self.minute)
            .map_err(|error| SyncError::Decode(error.to_string()))?;
        let hour = u8::try_from(self.hour).map_err(|error| SyncError::Decode(error.to_string()))?;
        let minute =
            u8::try_from(self.minute).map_err(|error| SyncError::Decode(error.to_string()))?;

        let flags = [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ];
        let days = WEEK
            .iter()
            .zip(flags)
            .filter(|(_, enabled)| *enabled)
            .map(|(day, _)| *day)
            .collect::<DaysOfWeek>();

        Ok(Alarm {
            id: None,
            remote_id: Some(RemoteId::new(self.id)),
            hour,
            minute,
            days,
            enabled: self.enabled,
            label: self.label,
            alert: defaults.alert_sound.clone(),
            vibrate: true,
            delete_after_use: false,
            timestamp: self.timestamp,
        })
    }
}

/// Decode one server alarm object.
///
/// Missing or mistyped fields, and out-of-range times, fail this record only.
pub fn decode_alarm(value: Value, defaults: &DecodeDefaults) -> SyncResult<Alarm> {
    let wire = serde_json::from_value::<WireAlarm>(value)
        .map_err(|error| SyncError::Decode(error.to_string()))?;
    wire.into_alarm(defaults)
}

#[derive(Debug, Deserialize)]
struct AlarmEnvelope {
    alarms: Vec<Value>,
}

/// Decode a `getAlarm` response body of the form `{"alarms": [...]}`.
///
/// A malformed envelope fails the whole batch. A malformed record is logged,
/// counted in [`AlarmBatch::skipped`] and left out; the rest still decode.
pub fn decode_alarm_batch(body: &str, defaults: &DecodeDefaults) -> SyncResult<AlarmBatch> {
    let envelope = serde_json::from_str::<AlarmEnvelope>(body)
        .map_err(|error| SyncError::Decode(format!("invalid alarms envelope: {error}")))?;

    let mut batch = AlarmBatch::default();
    for (index, record) in envelope.alarms.into_iter().enumerate() {
        match decode_alarm(record, defaults) {
            Ok(alarm) => batch.alarms.push(alarm),
            Err(error) => {
                warn!(index, %error, "Skipping unreadable LightUpPi alarm record");
                batch.skipped += 1;
            }
        }
    }
    Ok(batch)
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    success: bool,
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    timestamp: Option<i64>,
}

fn decode_status(body: &str) -> SyncResult<StatusResponse> {
    let response = serde_json::from_str::<StatusResponse>(body)
        .map_err(|error| SyncError::Decode(error.to_string()))?;
    if response.success {
        Ok(response)
    } else {
        Err(SyncError::ServerRejected)
    }
}

fn required(value: Option<i64>, field: &str) -> SyncResult<i64> {
    value.ok_or_else(|| SyncError::Decode(format!("response is missing '{field}'")))
}

/// Decode an `addAlarm` response into the server ID of the new alarm
pub fn decode_add_response(body: &str) -> SyncResult<RemoteId> {
    let response = decode_status(body)?;
    Ok(RemoteId::new(required(response.id, "id")?))
}

/// Decode an `editAlarm` response
pub fn decode_edit_response(body: &str) -> SyncResult<EditAck> {
    let response = decode_status(body)?;
    Ok(EditAck {
        remote_id: RemoteId::new(required(response.id, "id")?),
        timestamp: required(response.timestamp, "timestamp")?,
    })
}

/// Decode a `deleteAlarm` response
pub fn decode_delete_response(body: &str) -> SyncResult<()> {
    decode_status(body).map(|_| ())
}
