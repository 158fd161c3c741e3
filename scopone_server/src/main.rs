mod config;
mod connection;
mod error;
mod table;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{ServerCli, ServerConfig};
use crate::table::{Outcome, Table};

/// How long connections get to flush their last messages at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = ServerCli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let addr = cli.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Scopone server listening on {}", listener.local_addr()?);
    if cli.debug {
        warn!("debug mode: every hand is visible to every connection");
    }

    let outcome = serve(listener, cli.config()).await;
    info!("session over: {:?}", outcome);
    Ok(())
}

/// Runs one table on `listener` until the session ends, then lets every
/// connection flush and close.
pub async fn serve(listener: TcpListener, config: ServerConfig) -> Outcome {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let tracker = TaskTracker::new();
    let acceptor = tokio::spawn(connection::accept_loop(listener, events_tx, tracker.clone()));

    let outcome = Table::new(config, events_rx).run().await;

    acceptor.abort();
    tracker.close();
    if tokio::time::timeout(SHUTDOWN_GRACE, tracker.wait()).await.is_err() {
        warn!("{} connection(s) still open at shutdown", tracker.len());
    }
    outcome
}
