use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "trackr",
    about = "Issue-tracker front end that resolves loose names and values to canonical ones",
    version
)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, env = "TRACKR_CONFIG")]
    pub config: Option<PathBuf>,

    /// API token; overrides the config file
    #[arg(long, global = true, env = "TRACKR_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve a query to a project member login
    Member {
        /// Project id, e.g. DEMO
        project: String,
        /// Name, login or email fragment
        query: String,
    },

    /// Resolve a query to an allowed value of a field
    Value {
        project: String,
        /// Field name, e.g. State
        field: String,
        query: String,
    },

    /// Print a command with every field value canonicalized
    Rewrite {
        project: String,
        /// Command such as "state fix for john"
        command: String,
    },

    /// Rewrite a command and apply it to an issue
    Apply {
        /// Issue id, e.g. DEMO-42
        issue: String,
        command: String,
        /// Project used for resolution; defaults to the issue prefix
        #[arg(long)]
        project: Option<String>,
    },

    /// Print the last project used with the configured token
    LastProject,

    /// Metadata cache maintenance
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Serve JSON-lines tool calls on stdin/stdout
    Tools,
}

#[derive(Debug, Subcommand)]
pub enum CacheCommands {
    /// Drop cached metadata for one project, or all projects
    Drop {
        #[arg(long)]
        project: Option<String>,
    },
}
