//! Configuration management for the PDF to HTML server

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::converter::ConverterBackend;

/// Default request body limit: 1 GiB
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub record_store: RecordStoreConfig,
    pub upload: UploadConfig,
    pub converter: ConverterConfig,
    pub fetch: FetchConfig,
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordStoreConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    /// Bypasses row-level security when present
    pub service_key: Option<String>,
    pub table: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_content_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConverterConfig {
    pub backend: ConverterBackend,
    /// Program to run; defaults to the backend's binary name
    pub program: Option<String>,
    pub timeout_secs: u64,
    /// Root for per-request workspaces; system temp dir when unset
    pub temp_dir: Option<PathBuf>,
}

impl ConverterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn program(&self) -> &str {
        self.program
            .as_deref()
            .unwrap_or_else(|| self.backend.default_program())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub timeout_secs: u64,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration errors reported at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown converter backend: {0}")]
    UnknownBackend(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            record_store: RecordStoreConfig {
                url: None,
                anon_key: None,
                service_key: None,
                table: "documents".to_string(),
            },
            upload: UploadConfig {
                dir: PathBuf::from("/uploads"),
                max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            },
            converter: ConverterConfig {
                backend: ConverterBackend::Pdftohtml,
                program: None,
                timeout_secs: 120,
                temp_dir: None,
            },
            fetch: FetchConfig { timeout_secs: 60 },
            debug: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// `DEBUG` alone, read before logging is set up so the log filter can
    /// be chosen ahead of the rest of the configuration
    pub fn debug_from_env() -> bool {
        env::var("DEBUG").map(|v| parse_flag(&v)).unwrap_or(false)
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let backend = match var("CONVERTER_BACKEND") {
            Some(name) => name
                .parse()
                .map_err(|_| ConfigError::UnknownBackend(name))?,
            None => defaults.converter.backend,
        };

        Ok(Config {
            server: ServerConfig {
                host: var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_or("SERVER_PORT", var("SERVER_PORT"), defaults.server.port),
            },
            record_store: RecordStoreConfig {
                url: var("SUPABASE_URL"),
                anon_key: var("SUPABASE_ANON_KEY"),
                service_key: var("SUPABASE_SERVICE_KEY"),
                table: var("SUPABASE_TABLE").unwrap_or(defaults.record_store.table),
            },
            upload: UploadConfig {
                dir: var("UPLOAD_FOLDER")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.upload.dir),
                max_content_length: parse_or(
                    "MAX_CONTENT_LENGTH",
                    var("MAX_CONTENT_LENGTH"),
                    defaults.upload.max_content_length,
                ),
            },
            converter: ConverterConfig {
                backend,
                program: var("CONVERTER_BIN").map(|program| match env::current_dir() {
                    Ok(cwd) => resolve_program(&program, &cwd),
                    Err(_) => program,
                }),
                timeout_secs: parse_or(
                    "CONVERTER_TIMEOUT_SECS",
                    var("CONVERTER_TIMEOUT_SECS"),
                    defaults.converter.timeout_secs,
                ),
                temp_dir: var("TEMP_DIR").map(PathBuf::from),
            },
            fetch: FetchConfig {
                timeout_secs: parse_or(
                    "FETCH_TIMEOUT_SECS",
                    var("FETCH_TIMEOUT_SECS"),
                    defaults.fetch.timeout_secs,
                ),
            },
            debug: var("DEBUG")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.debug),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Anchor a relative program path to `cwd`.
///
/// The converter runs inside its workspace, so `./bin/pdftohtml` would
/// otherwise resolve there. Bare names are left for `PATH` lookup.
fn resolve_program(program: &str, cwd: &Path) -> String {
    let path = Path::new(program);
    if path.is_absolute() || path.components().count() < 2 {
        return program.to_string();
    }
    cwd.join(path).to_string_lossy().into_owned()
}

fn parse_or<T: FromStr + Copy>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}: {:?}, using default", key, raw);
            default
        }),
        None => default,
    }
}
