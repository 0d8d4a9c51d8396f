use std::path::Path;

use lightup_core::db::LibSqlAlarmRepository;
use lightup_core::RemoteId;

use crate::commands::common::{
    find_alarm, finish_sync, load_settings, open_database, sync_orchestrator,
};
use crate::error::CliError;

/// Add a local-only alarm to the server
pub async fn run_push(id: &str, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let alarm = find_alarm(&LibSqlAlarmRepository::new(db.connection()), id).await?;
    let settings = load_settings(&db).await?;

    let mut sync = sync_orchestrator(&db, &settings)?;
    let dispatched = sync.add(alarm);
    finish_sync(&mut sync, dispatched).await
}

/// Refresh one alarm from the server by its server ID
pub async fn run_get(remote_id: i64, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let settings = load_settings(&db).await?;

    let mut sync = sync_orchestrator(&db, &settings)?;
    let dispatched = sync.get(RemoteId::new(remote_id));
    finish_sync(&mut sync, dispatched).await
}

/// Replace local alarms with the server's alarm set
pub async fn run_pull(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let settings = load_settings(&db).await?;

    let mut sync = sync_orchestrator(&db, &settings)?;
    let dispatched = sync.push_to_phone();
    finish_sync(&mut sync, dispatched).await
}
