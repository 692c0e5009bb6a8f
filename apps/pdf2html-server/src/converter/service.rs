//! Conversion service
//!
//! Wraps a [`Converter`] with workspace management, a bounded timeout and
//! the output check that decides whether a conversion succeeded.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ConverterConfig;

use super::external::ExternalConverter;
use super::types::{ConvertError, PageRange};
use super::workspace::{HtmlArtifact, Workspace};
use super::Converter;

/// Shared entry point for every conversion route
#[derive(Clone)]
pub struct ConversionService {
    converter: Arc<dyn Converter>,
    timeout: Duration,
    temp_root: Option<PathBuf>,
}

impl ConversionService {
    pub fn new(converter: Arc<dyn Converter>, timeout: Duration, temp_root: Option<PathBuf>) -> Self {
        Self {
            converter,
            timeout,
            temp_root,
        }
    }

    /// Build the external converter selected by configuration
    pub fn from_config(config: &ConverterConfig) -> Self {
        let converter = ExternalConverter::new(config.backend, config.program());
        Self::new(Arc::new(converter), config.timeout(), config.temp_dir.clone())
    }

    pub fn converter_name(&self) -> &str {
        self.converter.name()
    }

    /// Allocate a fresh workspace for one request
    pub fn workspace(&self) -> io::Result<Workspace> {
        Workspace::create(self.temp_root.as_deref())
    }

    /// Write `bytes` into a new workspace and convert them
    pub async fn convert_bytes(
        &self,
        bytes: &[u8],
        range: Option<PageRange>,
    ) -> Result<HtmlArtifact, ConvertError> {
        let workspace = self.workspace()?;
        workspace.write_input(bytes).await?;
        self.convert(workspace, range).await
    }

    /// Convert the input already stored in `workspace`.
    ///
    /// The input file is removed as soon as the converter finishes, whatever
    /// the outcome. On error the whole workspace is dropped here.
    pub async fn convert(
        &self,
        workspace: Workspace,
        range: Option<PageRange>,
    ) -> Result<HtmlArtifact, ConvertError> {
        let input = workspace.input_path();
        let started = Instant::now();

        let result = tokio::time::timeout(self.timeout, self.converter.convert(&input, range)).await;

        if let Err(e) = tokio::fs::remove_file(&input).await {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %input.display(), "Failed to remove converter input: {}", e);
            }
        }

        let output = match result {
            Ok(output) => output?,
            Err(_) => return Err(ConvertError::Timeout(self.timeout)),
        };

        let artifact = HtmlArtifact::open(workspace, output).await?;

        tracing::info!(
            backend = self.converter.name(),
            pages = %range.map(|r| r.to_string()).unwrap_or_else(|| "all".to_string()),
            bytes = artifact.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Conversion complete"
        );

        Ok(artifact)
    }
}
