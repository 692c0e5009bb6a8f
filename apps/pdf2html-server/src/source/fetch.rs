//! Remote PDF download

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, Url};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Upstream returned {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    Request(reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Downloads PDFs over HTTP(S) with a bounded total time
#[derive(Clone)]
pub struct PdfFetcher {
    client: Client,
    timeout: Duration,
}

impl PdfFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pdf2html-server/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    /// Use a preconfigured client; `timeout` is only reported in errors
    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Validate a caller-supplied URL; only absolute http(s) URLs are fetched
    pub fn parse_url(raw: &str) -> Result<Url, FetchError> {
        let url = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", raw, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(FetchError::InvalidUrl(format!("unsupported scheme {:?}", other))),
        }
    }

    /// Stream the resource at `url` into `dest`, returning the byte count
    pub async fn fetch_to(&self, url: &Url, dest: &Path) -> Result<u64, FetchError> {
        tracing::debug!(url = %url, "Fetching PDF");

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(e))? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::info!(url = %url, bytes = written, "Fetched PDF");
        Ok(written)
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Request(err)
        }
    }
}

/// Last path segment of `url`, percent-decoded, if it has one
pub fn url_file_name(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.last()?;
    if segment.is_empty() {
        return None;
    }
    Some(
        urlencoding::decode(segment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| segment.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        assert!(PdfFetcher::parse_url("https://example.com/a.pdf").is_ok());
        assert!(PdfFetcher::parse_url(" http://example.com/a.pdf ").is_ok());
        assert!(matches!(
            PdfFetcher::parse_url("not a url"),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            PdfFetcher::parse_url("file:///etc/passwd"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_url_file_name() {
        let url = Url::parse("https://example.com/docs/My%20CV.pdf?x=1").unwrap();
        assert_eq!(url_file_name(&url).as_deref(), Some("My CV.pdf"));

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(url_file_name(&url), None);
    }
}
