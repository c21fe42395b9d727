//! Configuration: defaults, then an optional TOML file, then environment
//! variables. CLI flags are applied last by the binary.
//!
//! ```toml
//! backend = "remote"
//! api_url = "http://127.0.0.1:4300"
//! session_file = "/tmp/taskboard/session.json"
//! tasks_file = "/tmp/taskboard/tasks.json"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TaskboardError};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:4300";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Static users and a task list held in process
    #[default]
    Local,
    /// The REST API at `api_url`
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendKind,
    pub api_url: String,
    pub session_file: PathBuf,
    pub tasks_file: Option<PathBuf>,
    pub log_file: PathBuf,
    pub app_version: String,
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("taskboard")
}

impl Default for Config {
    fn default() -> Self {
        let dir = data_dir();
        Self {
            backend: BackendKind::Local,
            api_url: DEFAULT_API_URL.to_string(),
            session_file: dir.join("session.json"),
            tasks_file: Some(dir.join("tasks.json")),
            log_file: dir.join("taskboard.log"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Config {
    /// Loads `path` if given (it must exist), else `taskboard.toml` in the
    /// data directory if present, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let default_path = data_dir().join("taskboard.toml");
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if default_path.exists() => Self::from_file(&default_path)?,
            None => Self::default(),
        };
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| TaskboardError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| TaskboardError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `TASKBOARD_BACKEND`, `TASKBOARD_API_URL`, `TASKBOARD_SESSION_FILE`,
    /// `TASKBOARD_TASKS_FILE`. Unknown backend names are ignored.
    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(kind) = var("TASKBOARD_BACKEND") {
            match kind.to_ascii_lowercase().as_str() {
                "local" => self.backend = BackendKind::Local,
                "remote" => self.backend = BackendKind::Remote,
                _ => {}
            }
        }
        if let Some(url) = var("TASKBOARD_API_URL") {
            self.api_url = url;
        }
        if let Some(path) = var("TASKBOARD_SESSION_FILE") {
            self.session_file = PathBuf::from(path);
        }
        if let Some(path) = var("TASKBOARD_TASKS_FILE") {
            self.tasks_file = Some(PathBuf::from(path));
        }
        self
    }
}
