use std::path::Path;

use lightup_core::db::LibSqlAlarmRepository;

use crate::commands::common::{find_alarm, format_alarm_details, open_database};
use crate::error::CliError;

pub async fn run_show(id: &str, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let alarm = find_alarm(&LibSqlAlarmRepository::new(db.connection()), id).await?;

    for line in format_alarm_details(&alarm) {
        println!("{line}");
    }
    Ok(())
}
