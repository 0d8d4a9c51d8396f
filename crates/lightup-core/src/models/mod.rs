//! Data models for LightUp

mod alarm;
mod days;
mod settings;

pub use alarm::{validate_time, Alarm, AlarmId, RemoteId, DEFAULT_ALERT_SOUND};
pub use days::{DaysOfWeek, WEEK};
pub use settings::Settings;
