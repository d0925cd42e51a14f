//! HTTP routes
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/health` | store reachability plus run status |
//! | POST | `/api/v1/ingest` | start a background run |
//! | GET | `/api/v1/ingest/status` | run status |

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use roster_ingest::{IngestService, RecordStore, StatusSnapshot};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::error::AppError;
use crate::middleware;

/// Application state shared across handlers
pub struct AppState<S> {
    pub ingest: IngestService<S>,
    /// File ingested when a trigger names no path
    pub default_path: PathBuf,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            ingest: self.ingest.clone(),
            default_path: self.default_path.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TriggerRequest {
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub started: bool,
    pub status: StatusSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub job: StatusSnapshot,
}

/// Build the application router
pub fn router<S: RecordStore + 'static>(state: AppState<S>) -> Router {
    let api = Router::new()
        .route("/ingest", post(trigger_ingest::<S>))
        .route("/ingest/status", get(ingest_status::<S>));

    Router::new()
        .route("/health", get(health_check::<S>))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(middleware::tracing_layer())
}

/// Health check handler
async fn health_check<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<HealthResponse>, AppError> {
    state.ingest.pipeline().store().ping().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        database: "connected".to_string(),
        job: state.ingest.status(),
    }))
}

async fn ingest_status<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
) -> Json<StatusSnapshot> {
    Json(state.ingest.status())
}

/// Start a run; the body is optional
async fn trigger_ingest<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: TriggerRequest = if body.iter().all(u8::is_ascii_whitespace) {
        TriggerRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    let path = match request.path {
        Some(path) if path.trim().is_empty() => {
            return Err(AppError::BadRequest("path cannot be empty".to_string()));
        },
        Some(path) => PathBuf::from(path),
        None => state.default_path.clone(),
    };

    let started = match state.ingest.trigger(path.clone()) {
        Ok(_handle) => true,
        Err(_) => {
            info!(path = %path.display(), "Ingest already running, trigger ignored");
            false
        },
    };

    let code = if started {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };

    Ok((
        code,
        Json(TriggerResponse {
            started,
            status: state.ingest.status(),
        }),
    )
        .into_response())
}
