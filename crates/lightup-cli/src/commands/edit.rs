use std::path::Path;

use lightup_core::db::{AlarmStore, LibSqlAlarmRepository};
use lightup_core::sync::UpdateOptions;
use lightup_core::util::normalize_text_option;
use lightup_core::{Alarm, DaysOfWeek};

use crate::commands::common::{
    find_alarm, finish_sync, load_settings, open_database, parse_time, sync_orchestrator,
};
use crate::error::CliError;

#[derive(Debug, Default)]
pub struct EditOptions {
    pub time: Option<String>,
    pub days: Option<String>,
    pub label: Option<String>,
    pub enable: bool,
    pub disable: bool,
    pub local_only: bool,
}

/// Apply command-line changes to `alarm`; returns whether anything changed
pub fn apply_edits(alarm: &mut Alarm, options: &EditOptions) -> Result<bool, CliError> {
    let original = alarm.clone();

    if let Some(time) = options.time.as_deref() {
        let (hour, minute) = parse_time(time)?;
        alarm.set_time(hour, minute)?;
    }
    if let Some(days) = options.days.as_deref() {
        alarm.days = days.parse::<DaysOfWeek>()?;
    }
    if let Some(label) = options.label.clone() {
        alarm.label = normalize_text_option(Some(label)).unwrap_or_default();
    }
    if options.enable {
        alarm.enabled = true;
    }
    if options.disable {
        alarm.enabled = false;
    }

    Ok(*alarm != original)
}

pub async fn run_edit(id: &str, options: EditOptions, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlAlarmRepository::new(db.connection());
    let mut alarm = find_alarm(&repo, id).await?;

    if !apply_edits(&mut alarm, &options)? {
        println!("{}", id.trim());
        return Ok(());
    }

    if options.local_only || !alarm.is_synced() {
        let updated = repo.update(&alarm, true).await?;
        if let Some(id) = updated.id {
            println!("{id}");
        }
        return Ok(());
    }

    let settings = load_settings(&db).await?;
    let mut sync = sync_orchestrator(&db, &settings)?;
    let updated = sync.save_local(&alarm, UpdateOptions::LOCAL_EDIT).await?;
    if let Some(id) = updated.id {
        println!("{id}");
    }
    let dispatched = sync.in_flight() > 0;
    finish_sync(&mut sync, dispatched).await
}
