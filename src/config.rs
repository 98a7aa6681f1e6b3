//! Configuration.
//!
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! [server]
//! address = "0.0.0.0:9000"
//! context_path = "/shop"
//! dispatch = "worker-pool"
//! show_error_details = false
//!
//! [statics]
//! prefixes = ["/favicon.ico", "/assets/"]
//! root = "public"
//!
//! [log]
//! level = "debug"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub statics: StaticsConfig,
    pub log: LogConfig,
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, Error> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

/// Where a dispatch runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchMode {
    /// On the runtime worker that owns the connection.
    #[default]
    EventLoop,
    /// On tokio's blocking pool, freeing the worker for other connections
    /// while slow handlers run.
    WorkerPool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    /// Prefix the application is mounted under; stripped before routing.
    pub context_path: String,
    pub dispatch: DispatchMode,
    /// Render domain failures with type, message and backtrace on HTML responses.
    pub show_error_details: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:9000".to_owned(),
            context_path: String::new(),
            dispatch: DispatchMode::EventLoop,
            show_error_details: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticsConfig {
    pub prefixes: Vec<String>,
    /// Directory static paths are served from.
    pub root: PathBuf,
    /// `Cache-Control` max-age for static files; none when absent.
    pub max_age: Option<u64>,
}

impl Default for StaticsConfig {
    fn default() -> Self {
        Self {
            prefixes: ["/favicon.ico", "/static/", "/upload/", "/webjars/"]
                .map(str::to_owned)
                .to_vec(),
            root: PathBuf::from("resources"),
            max_age: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// An `EnvFilter` directive; `RUST_LOG` wins when set.
    pub level: String,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), ansi: true }
    }
}
