use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lightup_core::config::{ServerConfig, TransportConfig};
use lightup_core::db::{
    AlarmStore, Database, LibSqlAlarmRepository, LibSqlSettingsRepository, SettingsRepository,
};
use lightup_core::models::Settings;
use lightup_core::sync::{
    DecodeDefaults, LightUpPiClient, OutcomeSink, RouteProbe, SyncKind, SyncOrchestrator,
    SyncOutcome,
};
use lightup_core::util::normalize_text_option;
use lightup_core::{Alarm, AlarmId, RemoteId};
use serde::Serialize;

use crate::error::CliError;

pub type CliOrchestrator<'a> = SyncOrchestrator<LibSqlAlarmRepository<'a>, ConsoleOutcomes>;

#[derive(Debug, Serialize)]
pub struct AlarmListItem {
    pub id: Option<i64>,
    pub remote_id: Option<i64>,
    pub time: String,
    pub days: String,
    pub enabled: bool,
    pub label: String,
    pub alert: String,
    pub vibrate: bool,
    pub delete_after_use: bool,
    pub timestamp: i64,
}

pub fn alarm_to_list_item(alarm: &Alarm) -> AlarmListItem {
    AlarmListItem {
        id: alarm.id.map(AlarmId::get),
        remote_id: alarm.remote_id.map(RemoteId::get),
        time: alarm.time_label(),
        days: alarm.days.to_string(),
        enabled: alarm.enabled,
        label: alarm.label.clone(),
        alert: alarm.alert.clone(),
        vibrate: alarm.vibrate,
        delete_after_use: alarm.delete_after_use,
        timestamp: alarm.timestamp,
    }
}

fn sync_label(alarm: &Alarm) -> String {
    alarm
        .remote_id
        .map_or_else(|| "local".to_string(), |id| format!("pi:{id}"))
}

pub fn format_alarm_lines(alarms: &[Alarm]) -> Vec<String> {
    alarms
        .iter()
        .map(|alarm| {
            let id = alarm.id.map(|id| id.to_string()).unwrap_or_default();
            let time = alarm.time_label();
            let days = alarm.days.to_string();
            let state = if alarm.enabled { "on" } else { "off" };
            let sync = sync_label(alarm);

            if alarm.label.is_empty() {
                format!("{id:>4}  {time}  {days:<27}  {state:<3}  {sync}")
            } else {
                format!(
                    "{id:>4}  {time}  {days:<27}  {state:<3}  {sync:<8}  {}",
                    alarm.label
                )
            }
        })
        .collect()
}

pub fn format_alarm_details(alarm: &Alarm) -> Vec<String> {
    let yes_no = |value: bool| if value { "yes" } else { "no" };
    vec![
        format!(
            "ID:               {}",
            alarm.id.map(|id| id.to_string()).unwrap_or_default()
        ),
        format!("LightUpPi ID:     {}", sync_label(alarm)),
        format!("Time:             {}", alarm.time_label()),
        format!("Repeat:           {}", alarm.days),
        format!("Enabled:          {}", yes_no(alarm.enabled)),
        format!("Label:            {}", alarm.label),
        format!("Alert:            {}", alarm.alert),
        format!("Vibrate:          {}", yes_no(alarm.vibrate)),
        format!("Delete after use: {}", yes_no(alarm.delete_after_use)),
        format!("Timestamp:        {}", alarm.timestamp),
    ]
}

/// Parse `HH:MM` (or `H:MM`) into hour and minute
pub fn parse_time(value: &str) -> Result<(u8, u8), CliError> {
    let invalid = || CliError::InvalidTime(value.to_string());
    let (hour, minute) = value.trim().split_once(':').ok_or_else(invalid)?;
    if minute.len() != 2 {
        return Err(invalid());
    }
    let hour = hour.parse::<u8>().map_err(|_| invalid())?;
    let minute = minute.parse::<u8>().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

pub fn parse_alarm_id(value: &str) -> Result<AlarmId, CliError> {
    value
        .trim()
        .parse::<AlarmId>()
        .map_err(|_| CliError::InvalidAlarmId(value.to_string()))
}

pub async fn find_alarm(repo: &impl AlarmStore, id: &str) -> Result<Alarm, CliError> {
    let id = parse_alarm_id(id)?;
    repo.get(id).await?.ok_or(CliError::AlarmNotFound(id))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("LIGHTUP_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lightup")
        .join("lightup.db")
}

pub async fn open_database(path: &Path) -> Result<Database, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Database::open(path).await?)
}

/// Apply a `LIGHTUPPI_SERVER` override to stored settings
pub fn apply_server_override(mut settings: Settings, server: Option<String>) -> Settings {
    if let Some(server) = normalize_text_option(server) {
        settings.lightuppi_server = server;
    }
    settings
}

pub async fn load_settings(db: &Database) -> Result<Settings, CliError> {
    let stored = LibSqlSettingsRepository::new(db.connection()).load().await?;
    Ok(apply_server_override(stored, env::var("LIGHTUPPI_SERVER").ok()))
}

pub fn server_config(settings: &Settings) -> Result<ServerConfig, CliError> {
    let server = ServerConfig::from_settings(settings);
    if server.is_configured() {
        Ok(server)
    } else {
        Err(CliError::ServerNotConfigured)
    }
}

pub fn lightuppi_client(settings: &Settings) -> Result<Arc<LightUpPiClient>, CliError> {
    let client = LightUpPiClient::new(server_config(settings)?, TransportConfig::default())?;
    Ok(Arc::new(client))
}

pub fn sync_orchestrator<'a>(
    db: &'a Database,
    settings: &Settings,
) -> Result<CliOrchestrator<'a>, CliError> {
    let orchestrator = SyncOrchestrator::new(
        lightuppi_client(settings)?,
        Arc::new(RouteProbe::for_server(&server_config(settings)?)),
        LibSqlAlarmRepository::new(db.connection()),
        ConsoleOutcomes,
    )
    .with_defaults(DecodeDefaults::from_settings(settings));
    Ok(orchestrator)
}

/// Run a dispatched unit to completion and turn its outcome into an exit status
pub async fn finish_sync(sync: &mut CliOrchestrator<'_>, dispatched: bool) -> Result<(), CliError> {
    if !dispatched {
        return Err(CliError::SyncIncomplete);
    }
    let outcomes = sync.finish_pending().await;
    if outcomes.iter().all(SyncOutcome::is_success) {
        Ok(())
    } else {
        Err(CliError::SyncIncomplete)
    }
}

/// Prints progress to stderr and outcomes to stdout (success) or stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleOutcomes;

impl OutcomeSink for ConsoleOutcomes {
    fn progress_started(&self, kind: SyncKind) {
        eprintln!("Syncing with LightUpPi ({kind})...");
    }

    fn progress_finished(&self, kind: SyncKind) {
        tracing::debug!(%kind, "LightUpPi sync finished");
    }

    fn report(&self, _kind: SyncKind, outcome: &SyncOutcome) {
        if outcome.is_success() {
            println!("{outcome}");
        } else {
            eprintln!("{outcome}");
        }
    }
}
