//! Per-request workspaces and HTML artifacts
//!
//! Every conversion gets its own temporary directory holding the input PDF
//! and whatever the converter writes. The directory is removed when the
//! [`Workspace`] is dropped; an [`HtmlArtifact`] carries the workspace into
//! the response body so the output file lives exactly as long as the stream.

use std::io;
use std::path::{Path, PathBuf};

use axum::{
    body::{Body, Bytes},
    http::{header, StatusCode},
    response::Response,
};
use tempfile::TempDir;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::types::ConvertError;

/// Read size for streaming artifacts
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

const INPUT_FILE_NAME: &str = "source.pdf";

const FALLBACK_HTML_NAME: &str = "document.html";

/// A uniquely named temporary directory owned by one request
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace under `root`, or the system temp dir
    pub fn create(root: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pdf2html-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the input PDF is stored
    pub fn input_path(&self) -> PathBuf {
        self.dir.path().join(INPUT_FILE_NAME)
    }

    pub async fn write_input(&self, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.input_path();
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

/// A validated, non-empty HTML file ready to be streamed
#[derive(Debug)]
pub struct HtmlArtifact {
    file: File,
    len: u64,
    path: PathBuf,
    workspace: Workspace,
}

impl HtmlArtifact {
    /// Open the converter output, rejecting missing or empty files
    pub async fn open(workspace: Workspace, path: PathBuf) -> Result<Self, ConvertError> {
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(ConvertError::MissingOutput(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConvertError::MissingOutput(path))
            }
            Err(e) => return Err(ConvertError::Io(e)),
        };

        if metadata.len() == 0 {
            return Err(ConvertError::EmptyOutput(path));
        }

        let file = File::open(&path).await?;

        Ok(Self {
            file,
            len: metadata.len(),
            path,
            workspace,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream the file in chunks; the workspace is dropped with the stream
    pub fn into_body(self) -> Body {
        let stream = futures::stream::try_unfold(
            (self.file, self.workspace),
            |(mut file, workspace)| async move {
                let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    return Ok::<_, io::Error>(None);
                }
                buf.truncate(n);
                Ok(Some((Bytes::from(buf), (file, workspace))))
            },
        );
        Body::from_stream(stream)
    }

    /// Build an inline `text/html` response named `filename`
    pub fn into_response(self, filename: &str) -> Result<Response, axum::http::Error> {
        let len = self.len;
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .header(header::CONTENT_LENGTH, len)
            .header(header::CONTENT_DISPOSITION, inline_disposition(filename))
            .body(self.into_body())
    }
}

/// Derive the caller-visible HTML name from the source document's name.
///
/// A trailing `.pdf` in any casing becomes `.html`; anything else gets
/// `.html` appended.
pub fn html_filename(original: Option<&str>) -> String {
    let name = original
        .map(|n| n.rsplit(['/', '\\']).next().unwrap_or(n).trim())
        .filter(|n| !n.is_empty());

    let Some(name) = name else {
        return FALLBACK_HTML_NAME.to_string();
    };

    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".pdf") && name.len() > 4 {
        format!("{}.html", &name[..name.len() - 4])
    } else if lower == ".pdf" {
        FALLBACK_HTML_NAME.to_string()
    } else {
        format!("{}.html", name)
    }
}

/// `Content-Disposition: inline` with an ASCII fallback name and an
/// RFC 5987 `filename*` when the name is not plain ASCII
fn inline_disposition(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    let ascii: String = cleaned
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();

    if ascii == cleaned {
        format!("inline; filename=\"{}\"", ascii)
    } else {
        format!(
            "inline; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            urlencoding::encode(&cleaned)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_filename() {
        assert_eq!(html_filename(Some("resume.pdf")), "resume.html");
        assert_eq!(html_filename(Some("Resume.PDF")), "Resume.html");
        assert_eq!(html_filename(Some("notes.txt")), "notes.txt.html");
        assert_eq!(html_filename(Some("archive")), "archive.html");
        assert_eq!(html_filename(Some("dir/sub/report.Pdf")), "report.html");
        assert_eq!(html_filename(Some("")), "document.html");
        assert_eq!(html_filename(Some(".pdf")), "document.html");
        assert_eq!(html_filename(None), "document.html");
    }

    #[test]
    fn test_inline_disposition() {
        assert_eq!(inline_disposition("cv.html"), "inline; filename=\"cv.html\"");
        assert_eq!(
            inline_disposition("a\"b\\c.html"),
            "inline; filename=\"abc.html\""
        );
        assert_eq!(
            inline_disposition("résumé.html"),
            "inline; filename=\"r_sum_.html\"; filename*=UTF-8''r%C3%A9sum%C3%A9.html"
        );
    }

    #[tokio::test]
    async fn test_workspace_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let workspace = Workspace::create(Some(root.path())).unwrap();
        let input = workspace.write_input(b"%PDF").await.unwrap();
        assert!(input.exists());

        let dir = workspace.path().to_path_buf();
        drop(workspace);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_artifact_rejects_missing_and_empty_output() {
        let root = TempDir::new().unwrap();

        let workspace = Workspace::create(Some(root.path())).unwrap();
        let missing = workspace.path().join("out.html");
        let result = HtmlArtifact::open(workspace, missing).await;
        assert!(matches!(result, Err(ConvertError::MissingOutput(_))));

        let workspace = Workspace::create(Some(root.path())).unwrap();
        let empty = workspace.path().join("out.html");
        std::fs::write(&empty, b"").unwrap();
        let result = HtmlArtifact::open(workspace, empty).await;
        assert!(matches!(result, Err(ConvertError::EmptyOutput(_))));

        // Both workspaces went away with the errors
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_artifact_streams_then_cleans_up() {
        let root = TempDir::new().unwrap();
        let workspace = Workspace::create(Some(root.path())).unwrap();
        let path = workspace.path().join("out.html");
        let html = "<html>".repeat(STREAM_CHUNK_SIZE / 3);
        std::fs::write(&path, &html).unwrap();

        let artifact = HtmlArtifact::open(workspace, path).await.unwrap();
        assert_eq!(artifact.len(), html.len() as u64);

        let response = artifact.into_response("out.html").unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, html.as_bytes());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
