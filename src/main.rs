use anyhow::Result;
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{fs, io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use frame_inbox::{
    config::{self, Mode},
    context::RequestContext,
    models::partition::PartitionKey,
    routes,
    services::{
        bucket_namer::{BucketNamer, SystemClock},
        fs_object_store::FsObjectStore,
        inbox_service::InboxService,
        sqlite_index::SqliteIndex,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config + run mode ---
    let (cfg, mode) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting frame-inbox with config: {:?}", cfg);

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?,
    );

    let index = SqliteIndex::new(db);
    index.migrate().await?;
    if mode == Mode::Migrate {
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize core services ---
    let store = FsObjectStore::new(&cfg.storage_dir);
    let namer = BucketNamer::new(Arc::new(SystemClock));
    let service = InboxService::new(Arc::new(store), Arc::new(index), namer.clone());

    if let Mode::Sweep { partition, remove } = mode {
        let partition = partition
            .map(PartitionKey::new)
            .unwrap_or_else(|| namer.current_partition());
        let ctx = RequestContext::new("sweep");
        let report = service.reconcile.sweep(&ctx, &partition, remove).await?;
        for name in &report.orphans {
            println!("{}", name);
        }
        tracing::info!(
            "Sweep of {} done: {} scanned, {} orphans, {} removed",
            partition,
            report.scanned,
            report.orphans.len(),
            report.removed.len()
        );
        return Ok(());
    }

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.max_request_bytes).with_state(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
