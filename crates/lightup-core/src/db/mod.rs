//! Local storage layer for LightUp

mod alarm_repository;
mod connection;
mod migrations;
mod settings_repository;

pub use alarm_repository::{AlarmFilter, AlarmStore, LibSqlAlarmRepository};
pub use connection::Database;
pub use settings_repository::{LibSqlSettingsRepository, SettingsRepository};
