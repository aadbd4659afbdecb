use crate::data::{Config, ConfigOverrides, SolveStatus};
use crate::pipeline::{self, InputKind};
use axum::{Json, Router, extract::Query, http::StatusCode, routing::post};
use log::{error, info};
use serde::Serialize;
use std::net::SocketAddr;

#[derive(Debug, Serialize)]
pub struct SolveResponse {
    pub success: bool,
    pub status: SolveStatus,
    /// Settings the solve actually ran with.
    pub config: Config,
    pub report: String,
}

/// Takes a CSV preference table as the request body and settings from the
/// query string.
async fn solve_handler(
    Query(overrides): Query<ConfigOverrides>,
    body: String,
) -> Result<Json<SolveResponse>, (StatusCode, String)> {
    // the solve blocks; if the client goes away its result is simply dropped
    let result = tokio::task::spawn_blocking(move || {
        pipeline::run(&body, InputKind::Tabular, &overrides, false)
    })
    .await
    .map_err(|e| {
        error!("Solver task panicked: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, "solver task failed".to_string())
    })?;

    match result {
        Ok(report) => Ok(Json(SolveResponse {
            success: report.success(),
            status: report.status,
            report: report.to_string(),
            config: report.config,
        })),
        Err(e) if e.is_caller_fault() => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => {
            error!("{e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

pub fn router() -> Router {
    Router::new().route("/v1/assignment/solve", post(solve_handler))
}

pub async fn run_server(addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, router()).await
}
