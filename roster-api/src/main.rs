//! roster-api - school roster service
//!
//! Startup order: configuration, logging, root folder, database, token
//! secret, default image, HTTP listener.

use anyhow::{Context, Result};
use clap::Parser;
use roster_common::config::{resolve_root_folder, RootFolder, TomlConfig};
use roster_common::db::init_database;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use roster_api::assets::DiskAssetStore;
use roster_api::auth::TokenService;
use roster_api::db::settings::load_or_create_token_secret;
use roster_api::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "roster-api", version, about = "School roster service")]
struct Args {
    /// Bootstrap config file (default: ROSTER_CONFIG or the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root folder for the database, uploads and staging files
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Listen port, overriding the config file
    #[arg(long, env = "ROSTER_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting roster-api v{}", env!("CARGO_PKG_VERSION"));

    let root = RootFolder::new(resolve_root_folder(args.root_folder.as_deref(), &config));
    root.ensure_directories()?;
    info!("Root folder: {}", root.path().display());

    let db_path = root.database_path(&config.database_file);
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("Database ready: {}", db_path.display());

    let secret = match config.token_secret() {
        Some(secret) => secret,
        None => load_or_create_token_secret(&pool).await?,
    };
    let tokens = TokenService::new(&secret, config.auth.token_ttl_secs);

    DiskAssetStore::new(root.uploads_dir())
        .ensure_default_image()
        .await
        .context("Failed to write default student image")?;
    clear_staging_dir(&root.staging_dir());

    let state = AppState::new(
        pool,
        tokens,
        config.plans.clone(),
        root.uploads_dir(),
        root.staging_dir(),
        config.max_upload_bytes,
    );
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr = format!("{}:{}", config.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("roster-api listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Remove uploads left behind by a previous process that was killed mid-import
fn clear_staging_dir(dir: &Path) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read staging directory {}: {}", dir.display(), e);
            return;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Cannot remove stale upload {}: {}", path.display(), e),
            }
        }
    }
    if removed > 0 {
        info!("Removed {} stale staged upload(s)", removed);
    }
}
