//! Liveness and health endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub converter: String,
    pub record_store: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
}

async fn index() -> &'static str {
    "Hello World!"
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let record_store = state
        .record_store()
        .map(|store| store.describe())
        .unwrap_or_else(|_| "unavailable".to_string());

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "pdf2html-server",
        converter: state.conversion().converter_name().to_string(),
        record_store,
    })
}
