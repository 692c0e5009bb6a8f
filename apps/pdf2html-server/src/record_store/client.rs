//! PostgREST (Supabase) record store client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Url};

use crate::config::RecordStoreConfig;

use super::types::{DocumentMetadata, RecordStoreError, StoredDocument};
use super::RecordStore;

/// Which key the client was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Service role key, bypasses row-level security
    Service,
    /// Anonymous key, row-level security applies
    Anon,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Service => "service",
            KeyKind::Anon => "anon",
        }
    }
}

/// Read-only client for the `documents` table
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    rest_url: Url,
    table: String,
    key_kind: KeyKind,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("rest_url", &self.rest_url.as_str())
            .field("table", &self.table)
            .field("key_kind", &self.key_kind)
            .finish()
    }
}

impl SupabaseClient {
    /// Build a client for `base_url` authenticated with `key`; every query
    /// is bounded by `timeout`.
    ///
    /// Fails when the URL is not absolute http(s), the key is empty, or the
    /// key cannot be sent as a header value.
    pub fn new(
        base_url: &str,
        key: &str,
        table: &str,
        key_kind: KeyKind,
        timeout: Duration,
    ) -> Result<Self, RecordStoreError> {
        Self::with_builder(base_url, key, table, key_kind, Client::builder().timeout(timeout))
    }

    /// Like [`SupabaseClient::new`] on a preconfigured builder; the key
    /// headers are added to it
    pub fn with_builder(
        base_url: &str,
        key: &str,
        table: &str,
        key_kind: KeyKind,
        builder: reqwest::ClientBuilder,
    ) -> Result<Self, RecordStoreError> {
        let mut base = Url::parse(base_url.trim())
            .map_err(|e| RecordStoreError::Config(format!("invalid URL {:?}: {}", base_url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(RecordStoreError::Config(format!(
                "unsupported URL scheme {:?}",
                base.scheme()
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let rest_url = base
            .join("rest/v1/")
            .map_err(|e| RecordStoreError::Config(e.to_string()))?;

        let key = key.trim();
        if key.is_empty() {
            return Err(RecordStoreError::Config("empty access key".to_string()));
        }
        if table.trim().is_empty() {
            return Err(RecordStoreError::Config("empty table name".to_string()));
        }

        let mut headers = HeaderMap::new();
        let mut apikey = HeaderValue::from_str(key)
            .map_err(|_| RecordStoreError::Config("access key is not a valid header value".to_string()))?;
        apikey.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|_| RecordStoreError::Config("access key is not a valid header value".to_string()))?;
        bearer.set_sensitive(true);
        headers.insert("apikey", apikey);
        headers.insert(AUTHORIZATION, bearer);

        let client = builder.default_headers(headers).build()?;

        Ok(Self {
            client,
            rest_url,
            table: table.trim().to_string(),
            key_kind,
        })
    }

    /// Build a client from configuration: service key, then anon key.
    ///
    /// Returns `None` when neither key yields a client; callers run degraded.
    pub fn connect(config: &RecordStoreConfig, timeout: Duration) -> Option<Self> {
        let Some(url) = config.url.as_deref() else {
            tracing::warn!("SUPABASE_URL not set - resume functionality will be disabled");
            return None;
        };

        if let Some(service_key) = config.service_key.as_deref() {
            match Self::new(url, service_key, &config.table, KeyKind::Service, timeout) {
                Ok(client) => {
                    tracing::info!("Record store client initialized with service key");
                    return Some(client);
                }
                Err(e) => {
                    tracing::warn!("Service key failed ({}), falling back to anon key", e);
                }
            }
        }

        let Some(anon_key) = config.anon_key.as_deref() else {
            tracing::error!("No usable record store key - resume functionality will be disabled");
            return None;
        };

        match Self::new(url, anon_key, &config.table, KeyKind::Anon, timeout) {
            Ok(client) => {
                tracing::info!("Record store client initialized with anon key");
                Some(client)
            }
            Err(e) => {
                tracing::error!("Failed to initialize record store client: {}", e);
                None
            }
        }
    }

    pub fn key_kind(&self) -> KeyKind {
        self.key_kind
    }

    /// Table endpoint with PostgREST filter parameters
    pub fn query_url(&self, select: &str, user_id: &str, latest_only: bool) -> Url {
        let mut url = self.rest_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&self.table);
        }
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", select);
            query.append_pair("user_id", &format!("eq.{}", user_id));
            if latest_only {
                query.append_pair("order", "created_at.desc");
                query.append_pair("limit", "1");
            }
        }
        url
    }

    async fn get_rows<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, RecordStoreError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RecordStoreError::Status { status, body });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl RecordStore for SupabaseClient {
    fn describe(&self) -> String {
        format!("supabase ({} key)", self.key_kind.as_str())
    }

    async fn list_document_metadata(&self, user_id: &str) -> Result<Vec<DocumentMetadata>, RecordStoreError> {
        let url = self.query_url("user_id,filename,created_at", user_id, false);
        self.get_rows(url).await
    }

    async fn latest_document(&self, user_id: &str) -> Result<Option<StoredDocument>, RecordStoreError> {
        let url = self.query_url("file_data,filename", user_id, true);
        let rows: Vec<StoredDocument> = self.get_rows(url).await?;
        tracing::info!(user_id = %user_id, rows = rows.len(), "Record store response");
        Ok(rows.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn config(service_key: Option<&str>, anon_key: Option<&str>) -> RecordStoreConfig {
        RecordStoreConfig {
            url: Some("https://project.supabase.co".to_string()),
            anon_key: anon_key.map(String::from),
            service_key: service_key.map(String::from),
            table: "documents".to_string(),
        }
    }

    #[test]
    fn test_prefers_service_key() {
        let client = SupabaseClient::connect(&config(Some("service"), Some("anon")), TIMEOUT).unwrap();
        assert_eq!(client.key_kind(), KeyKind::Service);
    }

    #[test]
    fn test_falls_back_to_anon_key() {
        // A newline cannot travel in a header, so the service key fails
        let client = SupabaseClient::connect(&config(Some("bad\nkey"), Some("anon")), TIMEOUT).unwrap();
        assert_eq!(client.key_kind(), KeyKind::Anon);

        let client = SupabaseClient::connect(&config(None, Some("anon")), TIMEOUT).unwrap();
        assert_eq!(client.key_kind(), KeyKind::Anon);
    }

    #[test]
    fn test_unavailable_without_usable_key_or_url() {
        assert!(SupabaseClient::connect(&config(Some("bad\nkey"), None), TIMEOUT).is_none());
        assert!(SupabaseClient::connect(&config(None, Some("bad\nkey")), TIMEOUT).is_none());

        let mut no_url = config(None, Some("anon"));
        no_url.url = None;
        assert!(SupabaseClient::connect(&no_url, TIMEOUT).is_none());

        let mut bad_url = config(None, Some("anon"));
        bad_url.url = Some("not a url".to_string());
        assert!(SupabaseClient::connect(&bad_url, TIMEOUT).is_none());
    }

    #[test]
    fn test_latest_document_query() {
        let client =
            SupabaseClient::new("https://project.supabase.co", "anon", "documents", KeyKind::Anon, TIMEOUT).unwrap();

        let url = client.query_url("file_data,filename", "user 42", true);
        assert_eq!(
            url.as_str(),
            "https://project.supabase.co/rest/v1/documents?select=file_data%2Cfilename&user_id=eq.user+42&order=created_at.desc&limit=1"
        );
    }

    #[test]
    fn test_metadata_query_keeps_base_path() {
        let client =
            SupabaseClient::new("http://localhost:54321/proxy", "anon", "documents", KeyKind::Anon, TIMEOUT).unwrap();

        let url = client.query_url("user_id,filename,created_at", "abc", false);
        assert_eq!(
            url.as_str(),
            "http://localhost:54321/proxy/rest/v1/documents?select=user_id%2Cfilename%2Ccreated_at&user_id=eq.abc"
        );
    }

    #[tokio::test]
    async fn test_unresponsive_store_times_out() {
        use axum::{routing::get, Router};

        let app = Router::new().route(
            "/rest/v1/documents",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                "[]"
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let builder = Client::builder()
            .no_proxy()
            .timeout(Duration::from_millis(200));
        let client = SupabaseClient::with_builder(
            &format!("http://{}", addr),
            "anon",
            "documents",
            KeyKind::Anon,
            builder,
        )
        .unwrap();

        let started = std::time::Instant::now();
        let err = client.latest_document("user-1").await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(&err, RecordStoreError::Request(e) if e.is_timeout()));
        assert_eq!(
            crate::error::AppError::from(err).status_code(),
            axum::http::StatusCode::GATEWAY_TIMEOUT
        );
    }
}
