//! trackr CLI - Composition Root
//!
//! Loads configuration, installs logging, wires the REST client behind the
//! shared metadata cache, and exposes the result as subcommands or as a
//! stdio tool server.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod tools;

pub use app::{App, AppliedCommand, Remote};
pub use cli::{CacheCommands, Cli, Commands};
pub use config::{ConfigError, LogFormat, TrackrConfig};
pub use error::{CliError, CliResult};
pub use tools::{available_tools, CallToolRequest, CallToolResponse, ContentBlock, Tool, ToolServer};
