use std::{process, sync::Arc};

use databyte::{
    application::{collections::CollectionService, error::AppError},
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        store::FsContentStore,
        telemetry,
    },
};
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) =
        config::load_with_cli().map_err(|err| AppError::from(InfraError::from(err)))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Check(_) => run_check(settings).await,
    }
}

fn build_collection_service(settings: &config::Settings) -> CollectionService {
    let store = FsContentStore::new(settings.content.directory.clone());
    CollectionService::new(Arc::new(store)).with_tier_overrides(settings.collections.clone())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = HttpState {
        collections: Arc::new(build_collection_service(&settings)),
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target: "databyte::serve",
        addr = %settings.server.addr,
        content = %settings.content.directory.display(),
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!(target: "databyte::serve", "shutdown requested"),
            Err(err) => warn!(target: "databyte::serve", error = %err, "failed to listen for shutdown signal"),
        }
        let _ = shutdown_tx.send(true);
    });

    let mut drain_rx = shutdown_rx.clone();
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            let mut rx = shutdown_rx;
            let _ = rx.wait_for(|stop| *stop).await;
        },
    );

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async {
            if drain_rx.wait_for(|stop| *stop).await.is_ok() {
                tokio::time::sleep(grace).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            warn!(target: "databyte::serve", grace_secs = grace.as_secs(), "graceful shutdown timed out");
        }
    }

    Ok(())
}

async fn run_check(settings: config::Settings) -> Result<(), AppError> {
    let service = build_collection_service(&settings);
    let counts = service.verify_all().await?;
    for (collection, records) in counts {
        info!(target: "databyte::check", collection, records, "collection loaded");
    }
    info!(target: "databyte::check", "content store is readable");
    Ok(())
}
