use std::env;
use std::path::Path;

use lightup_core::config::normalize_server_address;
use lightup_core::db::{LibSqlSettingsRepository, SettingsRepository};
use lightup_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::commands::common::{load_settings, open_database};
use crate::error::CliError;

pub async fn run_config(command: ConfigCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_config_show(db_path).await,
        ConfigCommands::SetServer { address } => run_config_set_server(address, db_path).await,
        ConfigCommands::SetAlert { uri } => run_config_set_alert(uri, db_path).await,
    }
}

async fn run_config_show(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let settings = load_settings(&db).await?;

    println!("Database:         {}", db_path.display());
    if settings.lightuppi_server.is_empty() {
        println!("LightUpPi server: (not set)");
    } else {
        println!("LightUpPi server: {}", settings.lightuppi_server);
    }
    if env::var_os("LIGHTUPPI_SERVER").is_some() {
        println!("                  (from LIGHTUPPI_SERVER)");
    }
    println!("Alert sound:      {}", settings.alert_sound());
    Ok(())
}

async fn run_config_set_server(address: String, db_path: &Path) -> Result<(), CliError> {
    let Some(normalized) = normalize_server_address(address.clone()) else {
        return Err(CliError::InvalidServerAddress(address));
    };

    let db = open_database(db_path).await?;
    let repo = LibSqlSettingsRepository::new(db.connection());
    let mut settings = repo.load().await?;
    settings.lightuppi_server.clone_from(&normalized);
    repo.save(&settings).await?;

    println!("LightUpPi server set to {normalized}");
    Ok(())
}

async fn run_config_set_alert(uri: Option<String>, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlSettingsRepository::new(db.connection());
    let mut settings = repo.load().await?;
    settings.default_alert_sound = normalize_text_option(uri);
    repo.save(&settings).await?;

    println!("Alert sound set to {}", settings.alert_sound());
    Ok(())
}
