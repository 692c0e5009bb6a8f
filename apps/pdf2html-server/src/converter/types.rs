//! Conversion types

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Page Range
// ============================================================================

/// Inclusive page bounds, 1-based. `last: None` means "to the end".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRange {
    pub first: u32,
    pub last: Option<u32>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageRangeError {
    #[error("{name} must be a positive integer, got {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("first_page ({first}) is after last_page ({last})")]
    Inverted { first: u32, last: u32 },
}

impl PageRange {
    /// Normalize optional bounds. A lone `last` starts at page 1.
    pub fn from_bounds(first: Option<u32>, last: Option<u32>) -> Result<Option<Self>, PageRangeError> {
        for (name, value) in [("first_page", first), ("last_page", last)] {
            if value == Some(0) {
                return Err(PageRangeError::Invalid {
                    name,
                    value: "0".to_string(),
                });
            }
        }

        let range = match (first, last) {
            (None, None) => return Ok(None),
            (None, Some(last)) => PageRange {
                first: 1,
                last: Some(last),
            },
            (Some(first), last) => PageRange { first, last },
        };

        if let Some(last) = range.last {
            if range.first > last {
                return Err(PageRangeError::Inverted {
                    first: range.first,
                    last,
                });
            }
        }

        Ok(Some(range))
    }

    /// Parse raw query values. Empty strings count as absent.
    pub fn parse(first: Option<&str>, last: Option<&str>) -> Result<Option<Self>, PageRangeError> {
        Self::from_bounds(parse_page("first_page", first)?, parse_page("last_page", last)?)
    }

    /// `-f`/`-l` arguments understood by both backends
    pub fn to_args(self) -> Vec<OsString> {
        let mut args = vec!["-f".into(), self.first.to_string().into()];
        if let Some(last) = self.last {
            args.push("-l".into());
            args.push(last.to_string().into());
        }
        args
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last {
            Some(last) => write!(f, "{}-{}", self.first, last),
            None => write!(f, "{}-", self.first),
        }
    }
}

fn parse_page(name: &'static str, raw: Option<&str>) -> Result<Option<u32>, PageRangeError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| PageRangeError::Invalid {
                name,
                value: value.to_string(),
            }),
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Supported external converter programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterBackend {
    /// poppler-utils `pdftohtml`
    Pdftohtml,
    /// `pdf2htmlEX`
    Pdf2htmlEx,
}

impl FromStr for ConverterBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdftohtml" | "poppler" => Ok(ConverterBackend::Pdftohtml),
            "pdf2htmlex" => Ok(ConverterBackend::Pdf2htmlEx),
            other => Err(other.to_string()),
        }
    }
}

impl ConverterBackend {
    pub fn name(&self) -> &'static str {
        match self {
            ConverterBackend::Pdftohtml => "pdftohtml",
            ConverterBackend::Pdf2htmlEx => "pdf2htmlex",
        }
    }

    pub fn default_program(&self) -> &'static str {
        match self {
            ConverterBackend::Pdftohtml => "pdftohtml",
            ConverterBackend::Pdf2htmlEx => "pdf2htmlEX",
        }
    }

    /// Command-line arguments for converting `input`
    pub fn args(&self, input: &Path, range: Option<PageRange>) -> Vec<OsString> {
        let mut args: Vec<OsString> = range.map(PageRange::to_args).unwrap_or_default();

        match self {
            ConverterBackend::Pdftohtml => {
                // -s: single document, -c: complex (positioned) output
                args.push("-s".into());
                args.push("-c".into());
                args.push(input.into());
                args.push(input.with_extension("").into());
            }
            ConverterBackend::Pdf2htmlEx => {
                let dest_dir = input.parent().unwrap_or_else(|| Path::new("."));
                args.push("--embed-font".into());
                args.push("0".into());
                args.push("--process-outline".into());
                args.push("0".into());
                args.push("--dest-dir".into());
                args.push(dest_dir.into());
                args.push(input.into());
                args.push(html_name(input).into());
            }
        }

        args
    }

    /// Where the backend writes its HTML for `input`
    pub fn output_path(&self, input: &Path) -> PathBuf {
        match self {
            ConverterBackend::Pdftohtml => {
                let mut base = input.with_extension("").into_os_string();
                base.push("-html.html");
                PathBuf::from(base)
            }
            ConverterBackend::Pdf2htmlEx => input.with_file_name(html_name(input)),
        }
    }
}

fn html_name(input: &Path) -> OsString {
    let mut name = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".html");
    name
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Converter timed out after {0:?}")]
    Timeout(Duration),

    #[error("Converter produced no output at {0}")]
    MissingOutput(PathBuf),

    #[error("Converter produced an empty file at {0}")]
    EmptyOutput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_last_page_only_starts_at_one() {
        let range = PageRange::parse(None, Some("4")).unwrap().unwrap();
        assert_eq!(range, PageRange { first: 1, last: Some(4) });
    }

    #[test]
    fn test_no_bounds_is_unrestricted() {
        assert_eq!(PageRange::parse(None, None).unwrap(), None);
        assert_eq!(PageRange::parse(Some(""), Some("  ")).unwrap(), None);
    }

    #[test]
    fn test_first_page_only_runs_to_end() {
        let range = PageRange::parse(Some("3"), None).unwrap().unwrap();
        assert_eq!(range, PageRange { first: 3, last: None });
        assert_eq!(strings(range.to_args()), vec!["-f", "3"]);
        assert_eq!(range.to_string(), "3-");
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(matches!(
            PageRange::parse(Some("abc"), None),
            Err(PageRangeError::Invalid { name: "first_page", .. })
        ));
        assert!(matches!(
            PageRange::parse(None, Some("0")),
            Err(PageRangeError::Invalid { name: "last_page", .. })
        ));
        assert!(matches!(
            PageRange::parse(Some("-2"), Some("3")),
            Err(PageRangeError::Invalid { .. })
        ));
        assert_eq!(
            PageRange::parse(Some("5"), Some("2")),
            Err(PageRangeError::Inverted { first: 5, last: 2 })
        );
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("pdftohtml".parse(), Ok(ConverterBackend::Pdftohtml));
        assert_eq!("pdf2htmlEX".parse(), Ok(ConverterBackend::Pdf2htmlEx));
        assert!("wkhtmltopdf".parse::<ConverterBackend>().is_err());
    }

    #[test]
    fn test_pdftohtml_invocation() {
        let input = Path::new("/tmp/work/source.pdf");
        let backend = ConverterBackend::Pdftohtml;
        let range = Some(PageRange { first: 1, last: Some(2) });

        assert_eq!(
            strings(backend.args(input, range)),
            vec!["-f", "1", "-l", "2", "-s", "-c", "/tmp/work/source.pdf", "/tmp/work/source"]
        );
        assert_eq!(
            strings(backend.args(input, None)),
            vec!["-s", "-c", "/tmp/work/source.pdf", "/tmp/work/source"]
        );
        assert_eq!(
            backend.output_path(input),
            PathBuf::from("/tmp/work/source-html.html")
        );
    }

    #[test]
    fn test_pdf2htmlex_invocation() {
        let input = Path::new("/tmp/work/source.pdf");
        let backend = ConverterBackend::Pdf2htmlEx;

        assert_eq!(
            strings(backend.args(input, Some(PageRange { first: 2, last: Some(3) }))),
            vec![
                "-f", "2", "-l", "3",
                "--embed-font", "0",
                "--process-outline", "0",
                "--dest-dir", "/tmp/work",
                "/tmp/work/source.pdf",
                "source.html",
            ]
        );
        assert_eq!(backend.output_path(input), PathBuf::from("/tmp/work/source.html"));
    }
}
