//! Guidepost server binary.
//!
//! Daily-guidance backend: mentor personas, curriculum paths, and a
//! sequential task progression state machine over SQLite.

use anyhow::Result;
use clap::Parser;
use guidepost::config::Config;
use guidepost::conversation::ScriptedConversation;
use guidepost::db::Database;
use guidepost::logging;
use guidepost::server::auth::SessionAuth;
use guidepost::server::{serve, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "guidepost", version, about = "Daily guidance progression backend")]
struct Cli {
    /// Config file path (default: ~/.guidepost/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database path (overrides config)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }

    logging::init(&config.log_filter)?;

    let db = Database::open(&config.db_path)?;
    info!(db_path = %config.db_path.display(), "database opened");

    let state = AppState {
        auth: Arc::new(SessionAuth::new(db.clone())),
        conversation: Arc::new(ScriptedConversation),
        policy: config.active_task_policy,
        db,
    };

    serve(&config.listen, state).await
}
