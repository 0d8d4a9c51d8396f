use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use lightup_core::config::MonitorConfig;
use lightup_core::state::ServerStatus;
use lightup_core::sync::{check_server, Connectivity, RouteProbe, ServerMonitor, SyncOutcome};
use lightup_core::ui::ui_channel;

use crate::commands::common::{lightuppi_client, load_settings, open_database};
use crate::error::CliError;

fn print_status(status: ServerStatus) {
    println!("{}  {status}", Local::now().format("%H:%M:%S"));
}

/// Check server reachability once
pub async fn run_ping(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let settings = load_settings(&db).await?;
    let client = lightuppi_client(&settings)?;

    if !RouteProbe::for_server(&client.server().await).is_connected() {
        eprintln!("{}", SyncOutcome::NoConnection);
        print_status(ServerStatus::Offline);
        return Ok(());
    }

    print_status(check_server(&client).await);
    Ok(())
}

/// Poll server reachability until `count` checks have run or Ctrl-C
pub async fn run_watch(
    count: Option<usize>,
    interval: u64,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let settings = load_settings(&db).await?;
    let client = lightuppi_client(&settings)?;

    let probe = RouteProbe::for_server(&client.server().await);
    let (ui, mut ui_loop) = ui_channel();
    let mut monitor = ServerMonitor::with_config(
        client,
        Arc::new(probe),
        ui,
        MonitorConfig {
            interval: Duration::from_secs(interval.max(1)),
        },
    );
    monitor.start(
        || print_status(ServerStatus::Online),
        || print_status(ServerStatus::Offline),
    );

    let mut checks = 0usize;
    loop {
        tokio::select! {
            ran = ui_loop.run_next() => {
                if !ran {
                    break;
                }
                checks += 1;
                if !monitor.is_running() || count.is_some_and(|limit| checks >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    monitor.stop();
    Ok(())
}
