use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::AppConfig;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::errors::StartupError;
use crate::routes::{self, RouterSettings};
use crate::state::ServerState;
use service::{
    bookings::BookingsManager,
    file::admin_kv_store::ApiKeysStore,
    runtime,
    storage::{
        collection_store::{CollectionEvent, LocalCollectionStore},
        document_store::DocumentStore,
        kv_backend::FileBackend,
        WriteMode,
    },
};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Log every local collection change; stands in for the page-level update event.
async fn log_collection_events(mut rx: broadcast::Receiver<CollectionEvent>) {
    loop {
        match rx.recv().await {
            Ok(ev) => debug!(collection = %ev.collection, records = ev.records.len(), "collection updated"),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "collection event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Construct every store from config and wire them into handler state.
pub async fn build_state(cfg: &AppConfig) -> Result<ServerState, StartupError> {
    let storage = &cfg.storage;
    runtime::ensure_env(&cfg.static_dir, &[&storage.data_dir, &storage.local_dir])
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;

    let mode = WriteMode::from_atomic(storage.atomic_writes);
    if mode == WriteMode::Overwrite {
        warn!("storage.atomic_writes is off; a crash during a write can truncate a document");
    }

    let documents = Arc::new(DocumentStore::new(&storage.data_dir, mode));

    let local = Arc::new(LocalCollectionStore::new(
        Arc::new(FileBackend::new(&storage.local_dir, mode)),
        storage.key_prefix.clone(),
    ));
    tokio::spawn(log_collection_events(local.subscribe()));
    let bookings = Arc::new(BookingsManager::new(local));

    let api_keys = ApiKeysStore::with_mode(&cfg.auth.api_keys_file, mode)
        .await
        .map_err(|e| StartupError::InvalidConfig(format!("api key store {}: {e}", cfg.auth.api_keys_file)))?;
    if let Some(key) = &cfg.auth.bootstrap_key {
        api_keys
            .seed_if_empty(&cfg.auth.bootstrap_user, key)
            .await
            .map_err(|e| StartupError::Runtime(e.to_string()))?;
    }
    if cfg.auth.require_api_key_for_writes && api_keys.list().await.is_empty() {
        warn!("no API keys configured; writes are rejected until ADMIN_API_KEY is set or a key is added");
    }

    Ok(ServerState {
        documents,
        bookings,
        api_keys,
        require_api_key_for_writes: cfg.auth.require_api_key_for_writes,
    })
}

/// State plus router, ready to serve.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    let state = build_state(cfg).await?;
    let settings = RouterSettings {
        static_dir: cfg.static_dir.clone(),
        body_limit_bytes: cfg.server.body_limit_bytes,
    };
    Ok(routes::build_router(state, build_cors(), settings))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler unavailable; shutting down only on process exit");
        std::future::pending::<()>().await;
    }
    info!("received Ctrl+C, shutting down");
}

/// Public entry: build the app and run the HTTP server until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(
        %addr,
        data_dir = %cfg.storage.data_dir,
        atomic_writes = cfg.storage.atomic_writes,
        "starting results cms server"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
