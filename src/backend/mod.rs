mod handlers;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::alerts::scheduler::PipelineRunner;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Sqlite>,
    pub runner: Arc<PipelineRunner>,
}

pub async fn run_server(
    addr: SocketAddr,
    pool: Pool<Sqlite>,
    runner: Arc<PipelineRunner>,
) -> anyhow::Result<()> {
    let state = AppState { db: pool, runner };

    let app = Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::api_routes())
        .with_state(state);

    info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
