//! Sudoku Race server binary.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use sudoku_race::{MemoryStore, RaceCoordinator, SessionStore, SqliteStore, router};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Real-time two-player Sudoku race server.
#[derive(Debug, Parser)]
#[command(name = "sudoku_race", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// SQLite database path. Falls back to the DATABASE_URL environment
    /// variable; without either, sessions live in memory only.
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let database_url = args.database_url.or_else(|| std::env::var("DATABASE_URL").ok());

    let store: Arc<dyn SessionStore> = match database_url {
        Some(url) => {
            info!(path = %url, "Using SQLite session store");
            let store = SqliteStore::new(url);
            store.run_migrations()?;
            Arc::new(store)
        }
        None => {
            info!("No database configured, using in-memory session store");
            Arc::new(MemoryStore::new())
        }
    };

    let coordinator = RaceCoordinator::new(store);
    let app = router(coordinator);

    let listener = tokio::net::TcpListener::bind(&args.addr).await?;
    info!(addr = %args.addr, "Sudoku Race server ready");
    info!("Create games via POST /games, play via /ws/game/{{code}}");

    axum::serve(listener, app).await?;
    Ok(())
}
