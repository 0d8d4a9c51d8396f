use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use lightup_core::db::AlarmFilter;

#[derive(Parser)]
#[command(name = "lightup")]
#[command(about = "Manage LightUp alarms and sync them with a LightUpPi server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List local alarms
    #[command(alias = "ls")]
    List {
        /// Which alarms to show
        #[arg(long, value_enum, default_value_t = ListFilter::All)]
        filter: ListFilter,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single alarm
    Show {
        /// Local alarm ID
        id: String,
    },
    /// Create a new alarm
    #[command(alias = "new")]
    Add {
        /// Time of day as HH:MM
        time: String,
        /// Repeat days: mon,tue,..., daily, weekdays, weekends or once
        #[arg(long)]
        days: Option<String>,
        /// Alarm label
        #[arg(long)]
        label: Option<String>,
        /// Create the alarm switched off
        #[arg(long)]
        disabled: bool,
        /// Do not vibrate when the alarm fires
        #[arg(long)]
        no_vibrate: bool,
        /// Delete the alarm after it fires once
        #[arg(long)]
        delete_after_use: bool,
        /// Also add the alarm to the LightUpPi server
        #[arg(long)]
        push: bool,
    },
    /// Edit an existing alarm
    Edit {
        /// Local alarm ID
        id: String,
        /// New time of day as HH:MM
        #[arg(long)]
        time: Option<String>,
        /// New repeat days
        #[arg(long)]
        days: Option<String>,
        /// New label
        #[arg(long)]
        label: Option<String>,
        /// Switch the alarm on
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        /// Switch the alarm off
        #[arg(long)]
        disable: bool,
        /// Do not send the change to the LightUpPi server
        #[arg(long)]
        local_only: bool,
    },
    /// Delete an alarm
    Delete {
        /// Local alarm ID
        id: String,
        /// Keep the alarm on the LightUpPi server
        #[arg(long)]
        local_only: bool,
    },
    /// Add a local-only alarm to the LightUpPi server
    Push {
        /// Local alarm ID
        id: String,
    },
    /// Refresh one alarm from the LightUpPi server
    Get {
        /// LightUpPi server alarm ID
        remote_id: i64,
    },
    /// Replace local alarms with the LightUpPi server's alarms
    Pull,
    /// Check once whether the LightUpPi server is reachable
    Ping,
    /// Keep checking whether the LightUpPi server is reachable
    Watch {
        /// Stop after this many checks
        #[arg(long)]
        count: Option<usize>,
        /// Seconds between checks
        #[arg(long, default_value = "30")]
        interval: u64,
    },
    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ListFilter {
    All,
    Enabled,
    Synced,
    LocalOnly,
}

impl From<ListFilter> for AlarmFilter {
    fn from(filter: ListFilter) -> Self {
        match filter {
            ListFilter::All => Self::All,
            ListFilter::Enabled => Self::Enabled,
            ListFilter::Synced => Self::Synced,
            ListFilter::LocalOnly => Self::LocalOnly,
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the current settings
    Show,
    /// Set the LightUpPi server address
    SetServer {
        /// Server address as host[:port]
        address: String,
    },
    /// Set the alert sound given to alarms pulled from the server
    SetAlert {
        /// Alert sound URI; omit to restore the default
        uri: Option<String>,
    },
}
