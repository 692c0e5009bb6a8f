//! Upload routes
//!
//! Endpoints:
//! - GET /upload - HTML upload form
//! - POST /upload - store a multipart `file` field, redirect to its URL
//! - GET /uploads/:filename - serve a stored upload
//!
//! Files without a `.pdf` extension are rejected with 400 and nothing is
//! written. Errors are plain status codes with a short text body.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};

use crate::error::{AppError, PlainError, Result};
use crate::source::UploadError;
use crate::state::AppState;

const UPLOAD_FORM: &str = r#"<!doctype html>
<title>Upload new File</title>
<h1>Upload new File</h1>
<form action="" method=post enctype=multipart/form-data>
  <p><input type=file name=file>
     <input type=submit value=Upload>
</form>
"#;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", get(upload_form).post(upload_file))
        .route("/uploads/:filename", get(uploaded_file))
}

/// GET /upload
async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

/// POST /upload
async fn upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> std::result::Result<Response, PlainError> {
    Ok(store_upload(&state, multipart).await?)
}

async fn store_upload(state: &AppState, mut multipart: Multipart) -> Result<Response> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        // Browsers send an empty filename when nothing was selected
        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            return Err(UploadError::MissingFile.into());
        }

        let data = field.bytes().await.map_err(multipart_error)?;
        let stored = state.uploads().save(&file_name, &data).await?;
        let location = format!("/uploads/{}", urlencoding::encode(&stored));

        return Ok(Redirect::to(&location).into_response());
    }

    Err(UploadError::MissingFile.into())
}

/// GET /uploads/:filename
async fn uploaded_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> std::result::Result<Response, PlainError> {
    Ok(serve_upload(&state, &filename).await?)
}

async fn serve_upload(state: &AppState, filename: &str) -> Result<Response> {
    let path = state
        .uploads()
        .locate(filename)
        .await
        .ok_or_else(|| AppError::not_found(format!("No upload named {}", filename)))?;

    let bytes = tokio::fs::read(&path).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", filename),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge.into()
    } else {
        UploadError::Multipart(err.body_text()).into()
    }
}
