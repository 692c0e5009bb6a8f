//! PDF to HTML Server Library
//!
//! A thin HTTP layer around an external PDF to HTML converter. A PDF is taken
//! from a URL, an upload, or the record store, converted by `pdftohtml` or
//! `pdf2htmlEX` in a per-request temporary workspace, and streamed back as
//! `text/html`.
//!
//! # Modules
//!
//! - `converter`: page ranges, backends, workspaces, conversion service
//! - `source`: URL fetching and upload storage
//! - `record_store`: Supabase client and payload decoding
//! - `routes`: HTTP handlers
//!
//! The server binary is in main.rs; [`app`] builds the router for it and for
//! the integration tests.

pub mod config;
pub mod converter;
pub mod error;
pub mod record_store;
pub mod routes;
pub mod source;
pub mod state;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    let body_limit = state.config().upload.max_content_length;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::router())
        .merge(routes::convert::router())
        .merge(routes::resume::router())
        .merge(routes::upload::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
