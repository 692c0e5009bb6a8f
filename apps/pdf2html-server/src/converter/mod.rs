//! PDF to HTML conversion
//!
//! The conversion itself is delegated to an external program. This module
//! owns everything around it:
//!
//! - [`PageRange`]: normalized page bounds taken from the query string
//! - [`ConverterBackend`]: invocation syntax and output location per program
//! - [`Converter`]: the capability "convert(input path, page range) -> output path"
//! - [`ConversionService`]: workspaces, timeouts and artifact validation
//!
//! ```rust,ignore
//! let service = ConversionService::from_config(&config.converter);
//! let artifact = service.convert_bytes(&pdf_bytes, PageRange::parse(None, Some("3"))?).await?;
//! let response = artifact.into_response("report.html")?;
//! ```

mod external;
mod service;
mod types;
mod workspace;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use external::ExternalConverter;
pub use service::ConversionService;
pub use types::{ConvertError, ConverterBackend, PageRange, PageRangeError};
pub use workspace::{html_filename, HtmlArtifact, Workspace};

/// A program that turns a PDF file into an HTML file
#[async_trait]
pub trait Converter: Send + Sync {
    /// Short name used in logs and health output
    fn name(&self) -> &str;

    /// Convert `input`, returning the path of the HTML it produced.
    ///
    /// The returned path is where the output is expected to be; callers
    /// verify it exists and is non-empty.
    async fn convert(&self, input: &Path, range: Option<PageRange>) -> Result<PathBuf, ConvertError>;
}
