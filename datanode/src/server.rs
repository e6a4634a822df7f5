//! HTTP surface of the block server.

use crate::store::BlockStore;
use anyhow::Context;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use bytes::Bytes;
use common::error::FsError;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;

pub fn create_router(store: Arc<BlockStore>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/blocks/{block_id}",
            get(read_block).put(write_block).delete(delete_block),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

pub async fn run(listen: &str, store: Arc<BlockStore>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    tracing::info!("datanode listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn write_block(
    State(store): State<Arc<BlockStore>>,
    Path(block_id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, FsError> {
    store.write(&block_id, &body).await?;
    Ok(StatusCode::CREATED)
}

async fn read_block(
    State(store): State<Arc<BlockStore>>,
    Path(block_id): Path<String>,
) -> Result<Bytes, FsError> {
    match store.read(&block_id).await? {
        Some(data) => Ok(data),
        None => Err(FsError::NotFound(format!("no such block: {block_id}"))),
    }
}

async fn delete_block(
    State(store): State<Arc<BlockStore>>,
    Path(block_id): Path<String>,
) -> Result<StatusCode, FsError> {
    store.delete(&block_id).await?;
    Ok(StatusCode::OK)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutting down");
}
