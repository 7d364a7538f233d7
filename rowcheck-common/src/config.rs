//! Configuration loading
//!
//! Bootstrap settings are resolved with the following priority:
//! 1. Command-line argument or environment variable (parsed by the binary)
//! 2. TOML config file
//! 3. Compiled default (fallback)
//!
//! A missing TOML file is not an error: the service starts with defaults
//! and logs a warning. A malformed file is rejected.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// Default bind address (loopback only)
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Default storage root, relative to the working directory
pub const DEFAULT_STORAGE_ROOT: &str = "uploads";

/// Default number of processing workers
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default capacity of the pending job queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Default maximum accepted upload size (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration file contents
///
/// Every field is optional so that a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Directory holding uploads and generated reports
    #[serde(default)]
    pub storage_root: Option<PathBuf>,

    /// Interface to bind the HTTP server to
    #[serde(default)]
    pub bind_address: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Number of parallel processing workers
    #[serde(default)]
    pub worker_count: Option<usize>,

    /// Maximum number of queued (not yet started) jobs
    #[serde(default)]
    pub queue_capacity: Option<usize>,

    /// Upper bound on the multipart request body
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line (or via environment variables)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub storage_root: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub worker_count: Option<usize>,
    pub log_level: Option<String>,
}

/// Worker pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Number of workers consuming the job queue
    pub worker_count: usize,
    /// Capacity of the bounded job queue
    pub queue_capacity: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub storage_root: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub workers: WorkerSettings,
    pub max_upload_bytes: usize,
    pub log_level: String,
}

impl ServiceConfig {
    /// Merge overrides, file contents and compiled defaults
    pub fn resolve(overrides: ConfigOverrides, file: TomlConfig) -> Result<Self> {
        let config = Self {
            storage_root: overrides
                .storage_root
                .or(file.storage_root)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_ROOT)),
            bind_address: overrides
                .bind_address
                .or(file.bind_address)
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            workers: WorkerSettings {
                worker_count: overrides
                    .worker_count
                    .or(file.worker_count)
                    .unwrap_or(DEFAULT_WORKER_COUNT),
                queue_capacity: file.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
            },
            max_upload_bytes: file.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            log_level: overrides.log_level.unwrap_or(file.logging.level),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.workers.worker_count == 0 {
            return Err(Error::Config("worker_count must be at least 1".to_string()));
        }
        if self.workers.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must be at least 1".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be greater than 0".to_string()));
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "Unknown log level '{}' (expected one of: {})",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        if self.storage_root.as_os_str().is_empty() {
            return Err(Error::Config("storage_root must not be empty".to_string()));
        }
        Ok(())
    }

    /// Address string suitable for `TcpListener::bind`
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Platform config file location (`~/.config/rowcheck/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rowcheck").join("config.toml"))
}

/// Load TOML configuration
///
/// `path` is the explicitly requested file; when `None` the platform default
/// location is tried. Missing files yield defaults.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => {
                debug!("No platform config directory, using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    // Callers that asked for a specific file report its absence themselves;
    // this may run before any subscriber is installed.
    if !path.exists() {
        debug!(
            explicit,
            "No config file at {}, using defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}
