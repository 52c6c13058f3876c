use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use ares_router::Router;
use ares_sheets::google::{GoogleSheetsStore, TokenProvider, SHEETS_API_BASE};
use ares_sheets::{RetryPolicy, Workbook};
use ares_worker::config::WorkerConfig;
use ares_worker::logging::{self, LogFormat};
use ares_worker::scheduler;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    logging::init(LogFormat::parse(
        &std::env::var("LOG_FORMAT").unwrap_or_default(),
    ));

    let config = WorkerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        source_sheet = %config.source_sheet_id,
        target_sheet = %config.target_sheet_id,
        client_email = %config.service_account.client_email,
        timezone = %config.clock.timezone(),
        sources = %config.router.source_tables.join(","),
        window = config.router.window,
        "Starting ares-worker",
    );

    let http = reqwest::Client::new();
    let auth = Arc::new(TokenProvider::new(config.service_account.clone(), http.clone()));
    let policy = RetryPolicy {
        max_attempts: config.max_attempts,
        ..RetryPolicy::default()
    };
    let workbook = |spreadsheet_id: &str| {
        let store = GoogleSheetsStore::with_client(
            http.clone(),
            SHEETS_API_BASE.to_string(),
            spreadsheet_id.to_string(),
            Arc::clone(&auth),
        );
        Workbook::new(store, policy.clone())
    };

    let mut router = Router::new(
        workbook(&config.source_sheet_id),
        workbook(&config.target_sheet_id),
        config.clock,
        config.router.clone(),
    );

    match router.checkpoints().list().await {
        Ok(checkpoints) => {
            for checkpoint in checkpoints {
                tracing::info!(
                    source = %checkpoint.log_name,
                    last_row = checkpoint.last_row,
                    "Resuming from checkpoint",
                );
            }
        }
        Err(e) => tracing::warn!(error = %e, "Could not read checkpoints"),
    }

    if config.run_once {
        let ok = scheduler::run_logged(&mut router).await;
        std::process::exit(if ok { 0 } else { 1 });
    }

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    scheduler::run(&mut router, &config.schedule, &cancel).await;
}

/// Cancel `token` on SIGINT or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), finishing current pass");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, finishing current pass");
        }
    }
    token.cancel();
}
