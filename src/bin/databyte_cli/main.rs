//! databyte-cli: fetch collection pages through the session fetch-cache.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod print;

use std::{sync::Arc, time::Duration};

use clap::Parser;
use databyte::{
    cache::{CollectionQuery, Session},
    fetch::{FetchClient, FetchConfig, FetchStatus, HttpTransport, NetworkError},
};
use databyte_api_types::PageResult;
use thiserror::Error;

use args::{Cli, Commands, GetArgs};
use print::print_json;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("failed to render output: {0}")]
    Render(#[source] serde_json::Error),
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    let mut config = FetchConfig::default();
    if let Some(ms) = cli.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }
    let transport = HttpTransport::new(&cli.site)?;
    let client = FetchClient::new(Session::new(), Arc::new(transport)).with_config(config);

    match cli.command {
        Commands::Get(args) => get(&client, args).await,
        Commands::Stats => print_json(&client.document("/stats").await?),
    }
}

async fn get(client: &FetchClient, args: GetArgs) -> Result<(), CliError> {
    let mut query = CollectionQuery::new(args.collection);
    if let Some(page) = args.page {
        query = query.page(page);
    }
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }
    if let Some(sort) = args.sort {
        query = query.sort(sort);
    }
    for (key, value) in args.filters {
        query = query.filter(key, value);
    }

    let mut handle = client.handle();
    handle.observe(query);
    let state = handle.wait_settled().await;

    match (state.status, state.data, state.pagination) {
        (FetchStatus::Success, Some(data), Some(pagination)) => {
            print_json(&PageResult { data, pagination })
        }
        _ => {
            let message = state.error.unwrap_or_else(|| "no data returned".into());
            Err(CliError::Fetch(message))
        }
    }
}
