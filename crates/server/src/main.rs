// crates/server/src/main.rs
//! chatroom-reports server binary.
//!
//! Opens the database, starts the participants scheduler in the background
//! and serves the HTTP API.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use chatroom_reports_db::Database;
use chatroom_reports_server::{
    create_app, init_metrics, run_all_participants_tasks, spawn_scheduler,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 47893;

#[derive(Debug, Parser)]
#[command(name = "chatroom-reports", version, about = "Chat room participants reports")]
struct Cli {
    /// Port to listen on [env: CHATROOM_REPORTS_PORT, PORT]
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database file [env: CHATROOM_REPORTS_DB]
    #[arg(long, env = "CHATROOM_REPORTS_DB")]
    db: Option<PathBuf>,

    /// Run every participants task for yesterday, then exit
    #[arg(long)]
    run_once: bool,

    /// Serve the API without the periodic scheduler
    #[arg(long, conflicts_with = "run_once")]
    no_scheduler: bool,
}

/// Port from the CLI, then the environment, then the default.
fn get_port(cli_port: Option<u16>) -> u16 {
    cli_port
        .or_else(|| {
            std::env::var("CHATROOM_REPORTS_PORT")
                .ok()
                .or_else(|| std::env::var("PORT").ok())
                .and_then(|p| p.parse().ok())
        })
        .unwrap_or(DEFAULT_PORT)
}

async fn open_database(path: Option<PathBuf>) -> Result<Database> {
    let db = match path {
        Some(path) => Database::new(&path).await?,
        None => Database::open_default().await?,
    };
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    let cli = Cli::parse();
    let db = open_database(cli.db).await?;

    if cli.run_once {
        let written = run_all_participants_tasks(&db, None).await;
        tracing::info!(reports = written.len(), "One-shot participants run complete");
        return Ok(());
    }

    init_metrics();

    if cli.no_scheduler {
        tracing::info!("Scheduler disabled");
    } else {
        spawn_scheduler(db.clone());
    }

    let app = create_app(db);
    let port = get_port(cli.port);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for ctrl-c");
            }
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
