//! HTTP surface of the metadata server.

use crate::state::MdsState;
use anyhow::Context;
use axum::extract::{Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use common::error::FsError;
use common::protocol::{CommitRequest, CommitResponse, ListResponse};
use common::types::FileRecord;
use serde::Deserialize;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;

pub fn create_router(state: Arc<MdsState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/files/commit", post(commit_handler))
        .route("/files/stat", get(stat_handler))
        .route("/files/list", get(list_handler))
        .route("/files", delete(delete_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listen: &str, state: Arc<MdsState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    tracing::info!("mds listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn commit_handler(
    State(state): State<Arc<MdsState>>,
    Json(req): Json<CommitRequest>,
) -> Result<Json<CommitResponse>, FsError> {
    let record = state.commit(req).await?;
    Ok(Json(CommitResponse {
        path: record.path,
        version: record.version,
    }))
}

#[derive(Deserialize)]
struct PathQuery {
    path: String,
}

async fn stat_handler(
    State(state): State<Arc<MdsState>>,
    Query(query): Query<PathQuery>,
) -> Result<Json<FileRecord>, FsError> {
    Ok(Json(state.stat(&query.path).await?))
}

#[derive(Deserialize, Default)]
struct ListQuery {
    #[serde(default)]
    prefix: String,
}

async fn list_handler(
    State(state): State<Arc<MdsState>>,
    Query(query): Query<ListQuery>,
) -> Json<ListResponse> {
    Json(ListResponse {
        paths: state.list(&query.prefix).await,
    })
}

async fn delete_handler(
    State(state): State<Arc<MdsState>>,
    Query(query): Query<PathQuery>,
) -> Result<Json<FileRecord>, FsError> {
    Ok(Json(state.delete(&query.path).await?))
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
