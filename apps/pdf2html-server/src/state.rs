//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::converter::ConversionService;
use crate::error::AppError;
use crate::record_store::{RecordStore, SupabaseClient};
use crate::source::{PdfFetcher, UploadStore};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    conversion: ConversionService,
    fetcher: PdfFetcher,
    uploads: UploadStore,
    record_store: Option<Arc<dyn RecordStore>>,
}

impl AppState {
    /// Create application state with explicit collaborators
    pub fn new(
        config: Config,
        conversion: ConversionService,
        fetcher: PdfFetcher,
        record_store: Option<Arc<dyn RecordStore>>,
    ) -> Self {
        let uploads = UploadStore::new(config.upload.dir.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                conversion,
                fetcher,
                uploads,
                record_store,
            }),
        }
    }

    /// Create application state from configuration alone.
    ///
    /// Builds the configured converter backend and connects the record
    /// store, which may come back unavailable.
    pub fn from_config(config: Config) -> Result<Self, StateError> {
        let conversion = ConversionService::from_config(&config.converter);
        let fetcher = PdfFetcher::new(config.fetch.timeout())?;
        let record_store = SupabaseClient::connect(&config.record_store, config.fetch.timeout())
            .map(|client| Arc::new(client) as Arc<dyn RecordStore>);
        Ok(Self::new(config, conversion, fetcher, record_store))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the conversion service
    pub fn conversion(&self) -> &ConversionService {
        &self.inner.conversion
    }

    /// Get the URL fetcher
    pub fn fetcher(&self) -> &PdfFetcher {
        &self.inner.fetcher
    }

    /// Get the upload store
    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }

    /// Get the record store, or `Unavailable` when it was never initialized
    pub fn record_store(&self) -> Result<&dyn RecordStore, AppError> {
        self.inner
            .record_store
            .as_deref()
            .ok_or(AppError::Unavailable)
    }

    pub fn has_record_store(&self) -> bool {
        self.inner.record_store.is_some()
    }
}
