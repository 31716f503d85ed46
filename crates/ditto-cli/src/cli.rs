use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ditto")]
#[command(about = "Offline-first task list that syncs when the network comes back")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Quick capture: ditto "buy milk"
    #[arg(trailing_var_arg = true)]
    pub task: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new task
    #[command(alias = "new")]
    Add {
        /// Task text
        text: Vec<String>,
    },
    /// List live tasks, most recently changed first
    #[command(alias = "ls")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip a task between open and done
    #[command(alias = "done")]
    Toggle {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Delete a task
    #[command(alias = "rm")]
    Delete {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Push queued changes to the sync endpoint once
    Sync {
        /// Endpoint URL overriding config and environment
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
    },
    /// Show queued changes in the order they will be sent
    Outbox {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep syncing whenever the endpoint becomes reachable again
    Watch {
        /// Endpoint URL overriding config and environment
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
        /// Seconds between reachability probes
        #[arg(long, default_value = "15", value_name = "SECS")]
        interval: u64,
    },
    /// Manage persistent CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the stored configuration
    Show,
    /// Update stored sync settings
    Set {
        /// Sync endpoint URL (http:// or https://)
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
        /// Per-request timeout in seconds
        #[arg(long, value_name = "N")]
        timeout_secs: Option<u64>,
    },
}
