//! Record store
//!
//! Remote storage of user documents (Supabase, queried through PostgREST).
//! The client is built once at startup and shared read-only; handlers reach
//! it through [`crate::state::AppState`] as a [`RecordStore`] trait object.
//!
//! Key order: service key, then anon key, then unavailable. When no client
//! can be built the server keeps running and the record-store routes
//! answer 503.

mod client;
mod payload;
mod types;

use async_trait::async_trait;

pub use client::{KeyKind, SupabaseClient};
pub use payload::{decode_file_data, PayloadError};
pub use types::{DocumentMetadata, RecordStoreError, RecordTimestamp, StoredDocument, UserId};

/// Read-only queries against the documents table
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Human-readable description for health output
    fn describe(&self) -> String;

    /// All rows for `user_id`, metadata columns only
    async fn list_document_metadata(&self, user_id: &str) -> Result<Vec<DocumentMetadata>, RecordStoreError>;

    /// The most recently created row for `user_id`, with its payload
    async fn latest_document(&self, user_id: &str) -> Result<Option<StoredDocument>, RecordStoreError>;
}
