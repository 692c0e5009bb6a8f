//! URL conversion route
//!
//! `GET /convert?url=<pdf url>&first_page=<n>&last_page=<n>`
//!
//! Errors on this route are plain status codes with a short text body.

use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::converter::{html_filename, PageRange};
use crate::error::{AppError, PlainError, Result};
use crate::source::{url_file_name, PdfFetcher};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/convert", get(convert))
}

/// Query parameters; kept as strings so empty values count as absent
#[derive(Debug, Default, Deserialize)]
pub struct ConvertQuery {
    pub url: Option<String>,
    pub first_page: Option<String>,
    pub last_page: Option<String>,
}

async fn convert(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
) -> std::result::Result<Response, PlainError> {
    Ok(convert_url(&state, &query).await?)
}

async fn convert_url(state: &AppState, query: &ConvertQuery) -> Result<Response> {
    let raw_url = query
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing required parameter: url".to_string()))?;

    let range = PageRange::parse(query.first_page.as_deref(), query.last_page.as_deref())?;
    let url = PdfFetcher::parse_url(raw_url)?;

    tracing::debug!(url = %url, pages = ?range, "Converting from URL");

    let workspace = state.conversion().workspace()?;
    state
        .fetcher()
        .fetch_to(&url, &workspace.input_path())
        .await?;

    let artifact = state.conversion().convert(workspace, range).await?;
    let filename = html_filename(url_file_name(&url).as_deref());

    artifact
        .into_response(&filename)
        .map_err(|e| AppError::Internal(e.to_string()))
}
