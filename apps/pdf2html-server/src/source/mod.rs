//! Input PDF sources
//!
//! - `fetch`: download a PDF from a caller-supplied URL
//! - `upload`: filename policy and on-disk storage for uploaded PDFs
//!
//! The third source, the record store, lives in [`crate::record_store`].

mod fetch;
mod upload;

pub use fetch::{url_file_name, FetchError, PdfFetcher};
pub use upload::{allowed_file, secure_filename, UploadError, UploadStore};
