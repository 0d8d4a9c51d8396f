use std::path::Path;

use lightup_core::db::{AlarmStore, LibSqlAlarmRepository};
use lightup_core::models::Settings;
use lightup_core::util::normalize_text_option;
use lightup_core::{Alarm, DaysOfWeek};

use crate::commands::common::{
    finish_sync, load_settings, open_database, parse_time, sync_orchestrator,
};
use crate::error::CliError;

#[derive(Debug, Default)]
pub struct AddOptions {
    pub days: Option<String>,
    pub label: Option<String>,
    pub disabled: bool,
    pub no_vibrate: bool,
    pub delete_after_use: bool,
    pub push: bool,
}

/// Build a new local-only alarm from command-line input
pub fn build_alarm(
    time: &str,
    options: &AddOptions,
    settings: &Settings,
) -> Result<Alarm, CliError> {
    let (hour, minute) = parse_time(time)?;
    let mut alarm = Alarm::new(hour, minute)?;
    if let Some(days) = options.days.as_deref() {
        alarm.days = days.parse::<DaysOfWeek>()?;
    }
    alarm.label = normalize_text_option(options.label.clone()).unwrap_or_default();
    alarm.enabled = !options.disabled;
    alarm.vibrate = !options.no_vibrate;
    alarm.delete_after_use = options.delete_after_use;
    alarm.alert = settings.alert_sound().to_string();
    Ok(alarm)
}

pub async fn run_add(time: &str, options: AddOptions, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let settings = load_settings(&db).await?;
    let alarm = build_alarm(time, &options, &settings)?;

    let stored = LibSqlAlarmRepository::new(db.connection())
        .insert(&alarm)
        .await?;
    if let Some(id) = stored.id {
        println!("{id}");
    }

    if options.push {
        let mut sync = sync_orchestrator(&db, &settings)?;
        let dispatched = sync.add(stored);
        finish_sync(&mut sync, dispatched).await?;
    }
    Ok(())
}
