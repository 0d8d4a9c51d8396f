use std::path::Path;

use lightup_core::db::{AlarmStore, LibSqlAlarmRepository};

use crate::commands::common::{
    find_alarm, finish_sync, load_settings, open_database, sync_orchestrator,
};
use crate::error::CliError;

pub async fn run_delete(id: &str, local_only: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlAlarmRepository::new(db.connection());
    let alarm = find_alarm(&repo, id).await?;
    let Some(alarm_id) = alarm.id else {
        return Err(CliError::InvalidAlarmId(id.to_string()));
    };

    if local_only || !alarm.is_synced() {
        repo.delete(alarm_id).await?;
        println!("{alarm_id}");
        return Ok(());
    }

    let settings = load_settings(&db).await?;
    let mut sync = sync_orchestrator(&db, &settings)?;
    sync.delete_local(&alarm, true).await?;
    println!("{alarm_id}");
    let dispatched = sync.in_flight() > 0;
    finish_sync(&mut sync, dispatched).await
}
