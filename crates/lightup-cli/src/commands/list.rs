use std::path::Path;

use lightup_core::db::{AlarmFilter, AlarmStore, LibSqlAlarmRepository};

use crate::commands::common::{
    alarm_to_list_item, format_alarm_lines, open_database, AlarmListItem,
};
use crate::error::CliError;

pub async fn run_list(filter: AlarmFilter, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let alarms = LibSqlAlarmRepository::new(db.connection())
        .list(filter)
        .await?;

    if as_json {
        let json_items = alarms
            .iter()
            .map(alarm_to_list_item)
            .collect::<Vec<AlarmListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if alarms.is_empty() {
        println!("No alarms.");
        return Ok(());
    }

    for line in format_alarm_lines(&alarms) {
        println!("{line}");
    }
    Ok(())
}
