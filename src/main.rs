//! Uniform portal action server.
//!
//! Run with:
//!   PORTAL_ADMIN_PASSWORD=… cargo run -- --sqlite-db portal.db --roster-csv roster.csv

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use uniform_runtime::{
    build_router, import_roster_file, serve, ApprovalWorkflow, InMemoryRecordStore,
    SharedSecretAuthorizer,
};

use config::Config;

fn build_workflow(config: &Config) -> anyhow::Result<ApprovalWorkflow> {
    let authorizer = SharedSecretAuthorizer::new(config.admin_password.clone());
    match config.sqlite_db.as_deref() {
        Some(path) => sqlite_workflow(path, authorizer),
        None => {
            info!("using in-memory record store");
            Ok(ApprovalWorkflow::new(InMemoryRecordStore::new(), authorizer))
        }
    }
}

#[cfg(feature = "sqlite-persistence")]
fn sqlite_workflow(
    path: &str,
    authorizer: SharedSecretAuthorizer,
) -> anyhow::Result<ApprovalWorkflow> {
    let store = uniform_runtime::SqliteRecordStore::new(path)
        .with_context(|| format!("opening sqlite store {path}"))?;
    info!(path, "using sqlite record store");
    Ok(ApprovalWorkflow::new(store, authorizer))
}

#[cfg(not(feature = "sqlite-persistence"))]
fn sqlite_workflow(
    _path: &str,
    _authorizer: SharedSecretAuthorizer,
) -> anyhow::Result<ApprovalWorkflow> {
    anyhow::bail!("PORTAL_SQLITE_DB is set but sqlite-persistence is not compiled in")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    let workflow = build_workflow(&config)?;

    if let Some(path) = &config.roster_csv {
        let report = import_roster_file(workflow.store(), path)
            .with_context(|| format!("importing roster {}", path.display()))?;
        info!(enrolled = report.enrolled, skipped = report.skipped, "roster loaded");
    }

    let router = build_router(Arc::new(workflow), &config.server());
    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;

    serve(listener, router, shutdown_signal()).await?;
    info!("portal server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
