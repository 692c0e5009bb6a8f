//! Converter backed by an external program

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::types::{ConvertError, ConverterBackend, PageRange};
use super::Converter;

/// Runs `pdftohtml` or `pdf2htmlEX` as a child process
#[derive(Debug, Clone)]
pub struct ExternalConverter {
    backend: ConverterBackend,
    program: String,
}

impl ExternalConverter {
    pub fn new(backend: ConverterBackend, program: impl Into<String>) -> Self {
        Self {
            backend,
            program: program.into(),
        }
    }
}

#[async_trait]
impl Converter for ExternalConverter {
    fn name(&self) -> &str {
        self.backend.name()
    }

    async fn convert(&self, input: &Path, range: Option<PageRange>) -> Result<PathBuf, ConvertError> {
        let args = self.backend.args(input, range);
        let output_path = self.backend.output_path(input);

        tracing::debug!(program = %self.program, ?args, "Running converter");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        // Side files (images, fonts) land next to the input
        if let Some(dir) = input.parent() {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|source| ConvertError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.stdout.is_empty() {
            tracing::debug!(
                backend = self.backend.name(),
                stdout = %String::from_utf8_lossy(&output.stdout),
                "Converter stdout"
            );
        }
        if !output.stderr.is_empty() {
            tracing::debug!(
                backend = self.backend.name(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "Converter stderr"
            );
        }

        // Exit status is advisory; the artifact check decides success
        if !output.status.success() {
            tracing::warn!(
                backend = self.backend.name(),
                status = %output.status,
                "Converter exited with non-zero status"
            );
        }

        Ok(output_path)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write an executable shell script standing in for the converter
    fn fake_program(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-converter.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_runs_program_with_backend_arguments() {
        let bin_dir = TempDir::new().unwrap();
        let work_dir = TempDir::new().unwrap();
        // Writes its arguments into <last arg>-html.html, like pdftohtml -s
        let program = fake_program(
            bin_dir.path(),
            r#"for last; do :; done
echo "$@" > "$last-html.html""#,
        );

        let input = work_dir.path().join("source.pdf");
        std::fs::write(&input, b"%PDF-1.4").unwrap();

        let converter = ExternalConverter::new(
            ConverterBackend::Pdftohtml,
            program.to_string_lossy().into_owned(),
        );
        let output = converter
            .convert(&input, Some(PageRange { first: 1, last: Some(3) }))
            .await
            .unwrap();

        assert_eq!(output, work_dir.path().join("source-html.html"));
        let recorded = std::fs::read_to_string(&output).unwrap();
        assert!(recorded.starts_with("-f 1 -l 3 -s -c "));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_fatal() {
        let bin_dir = TempDir::new().unwrap();
        let work_dir = TempDir::new().unwrap();
        let program = fake_program(bin_dir.path(), "echo broken >&2\nexit 3");
        let input = work_dir.path().join("source.pdf");

        let converter = ExternalConverter::new(
            ConverterBackend::Pdf2htmlEx,
            program.to_string_lossy().into_owned(),
        );
        let output = converter.convert(&input, None).await.unwrap();

        assert_eq!(output, work_dir.path().join("source.html"));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let work_dir = TempDir::new().unwrap();
        let converter =
            ExternalConverter::new(ConverterBackend::Pdftohtml, "/nonexistent/pdftohtml");

        let result = converter
            .convert(&work_dir.path().join("source.pdf"), None)
            .await;

        assert!(matches!(result, Err(ConvertError::Spawn { .. })));
    }
}
