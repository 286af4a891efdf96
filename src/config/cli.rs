use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the DataByte binary.
#[derive(Debug, Parser)]
#[command(name = "databyte", version, about = "DataByte collection API server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "DATABYTE_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the collection API.
    Serve(Box<ServeArgs>),
    /// Load every collection once and report record counts.
    Check(CheckArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverride {
    /// Override the directory holding the collection JSON files.
    #[arg(
        long = "content-dir",
        value_name = "PATH",
        value_hint = ValueHint::DirPath
    )]
    pub content_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub content: ContentOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub content: ContentOverride,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit JSON logs instead of the compact format.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}
