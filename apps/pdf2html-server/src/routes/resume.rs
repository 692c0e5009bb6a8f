//! Record-store routes
//!
//! - `GET /resume/:user_id` - convert the user's latest stored document
//! - `GET /test-db/:user_id` - diagnostic probe of the documents table
//!
//! Errors on these routes are JSON bodies.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::converter::{html_filename, PageRange};
use crate::error::{AppError, Result, ROW_LEVEL_SECURITY_NOTE};
use crate::record_store::{decode_file_data, DocumentMetadata};
use crate::state::AppState;

const DEFAULT_DOCUMENT_NAME: &str = "resume";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/resume/:user_id", get(convert_resume))
        .route("/test-db/:user_id", get(test_db))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub first_page: Option<String>,
    pub last_page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TestDbResponse {
    pub user_id: String,
    pub found_documents: usize,
    pub documents: Vec<DocumentMetadata>,
}

/// GET /resume/:user_id
async fn convert_resume(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response> {
    let store = state.record_store()?;
    let range = PageRange::parse(query.first_page.as_deref(), query.last_page.as_deref())?;

    let document = store.latest_document(&user_id).await?.ok_or_else(|| {
        tracing::warn!(user_id = %user_id, "No documents found");
        AppError::NotFound {
            message: "No resume found for this user".to_string(),
            note: Some(ROW_LEVEL_SECURITY_NOTE.to_string()),
        }
    })?;

    let pdf = decode_file_data(document.file_data.as_deref().unwrap_or_default())?;

    tracing::info!(
        user_id = %user_id,
        bytes = pdf.len(),
        pages = ?range,
        "Converting stored document"
    );

    let artifact = state.conversion().convert_bytes(&pdf, range).await?;
    let filename = html_filename(Some(
        document
            .filename
            .as_deref()
            .unwrap_or(DEFAULT_DOCUMENT_NAME),
    ));

    artifact
        .into_response(&filename)
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// GET /test-db/:user_id
async fn test_db(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<TestDbResponse>> {
    let store = state.record_store()?;
    let rows = store.list_document_metadata(&user_id).await?;

    Ok(Json(TestDbResponse {
        found_documents: rows.len(),
        documents: rows.into_iter().take(1).collect(),
        user_id,
    }))
}
