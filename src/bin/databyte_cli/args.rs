//! Command-line surface for `databyte-cli`.

#![deny(clippy::all, clippy::pedantic)]

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "databyte-cli", version, about = "Query a DataByte collection API", long_about = None)]
pub struct Cli {
    /// API base URL, e.g. <http://127.0.0.1:5000>
    #[arg(
        long,
        env = "DATABYTE_SITE_URL",
        default_value = "http://127.0.0.1:5000"
    )]
    pub site: String,

    /// Abort a request that takes longer than this many milliseconds.
    #[arg(long = "timeout-ms", env = "DATABYTE_TIMEOUT_MS", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch one page of a collection
    Get(GetArgs),
    /// Fetch the club statistics document
    Stats,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Collection name (projects, members, blogs)
    pub collection: String,

    #[arg(long)]
    pub page: Option<usize>,

    #[arg(long)]
    pub limit: Option<usize>,

    /// Filter as KEY=VALUE; may be repeated
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    #[arg(long)]
    pub sort: Option<String>,
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}
