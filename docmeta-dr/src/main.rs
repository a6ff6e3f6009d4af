//! docmeta-dr (Database Review) - read-only query service
//!
//! Serves label, file and size lookups over docmeta.db as JSON. Never
//! writes to the database.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use docmeta_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use docmeta_dr::{build_router, db, AppState};
use tracing::{error, info, warn};

const MODULE_NAME: &str = "database-review";
const DEFAULT_LOG_FILTER: &str = "docmeta_dr=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "docmeta-dr")]
#[command(about = "Read-only query service for document metadata")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5730", env = "DOCMETA_DR_PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: std::net::IpAddr,

    /// Folder holding docmeta.db
    #[arg(long, env = "DOCMETA_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Database file (overrides --root-folder)
    #[arg(long, env = "DOCMETA_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG > config file [logging] level > built-in filter
    let config_result = TomlConfig::try_load_for_module(MODULE_NAME);
    let default_filter = match &config_result {
        Ok(Some(config)) => config.logging.level.clone(),
        _ => DEFAULT_LOG_FILTER.to_string(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    if let Err(e) = &config_result {
        warn!("Ignoring config file: {}", e);
    }

    // Build identification first, before any database delay
    info!(
        "Starting docmeta Database Review (docmeta-dr) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let db_path = match args.database {
        Some(path) => path,
        None => {
            let root_folder = RootFolderResolver::new(MODULE_NAME)
                .with_cli_arg(args.root_folder)
                .resolve();
            RootFolderInitializer::new(root_folder).database_path()
        }
    };
    info!("Database path: {}", db_path.display());

    let pool = match db::connect_readonly(&db_path).await {
        Ok(pool) => {
            info!("Connected to database (read-only)");
            pool
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e);
        }
    };

    let app = build_router(AppState::new(pool));

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("docmeta-dr listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
