use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::errors::{Result, TaskboardError};
use crate::user::User;

pub const SESSION_USER_KEY: &str = "user";

/// String key/value storage backed by a JSON file. Values are JSON text, as
/// in a browser's `sessionStorage`.
#[derive(Debug)]
pub struct SessionStorage {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl SessionStorage {
    /// Opens the storage at `path`. A missing file is an empty session; an
    /// unreadable one is discarded with a warning.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let items: BTreeMap<String, String> = if path.exists() {
            let data = fs::read_to_string(&path).map_err(|source| TaskboardError::Read {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&data).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "discarding malformed session file");
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, items })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    pub fn set_item(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.items.insert(key.to_string(), value.into());
        self.flush()
    }

    pub fn remove_item(&mut self, key: &str) -> Result<()> {
        if self.items.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.items.clear();
        self.flush()
    }

    /// The stored user, or `None` when absent or not a valid user record.
    pub fn user(&self) -> Option<User> {
        let raw = self.get_item(SESSION_USER_KEY)?;
        match serde_json::from_str(raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "ignoring malformed session user");
                None
            }
        }
    }

    pub fn set_user(&mut self, user: &User) -> Result<()> {
        let json = serde_json::to_string(user)?;
        self.set_item(SESSION_USER_KEY, json)
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| TaskboardError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(&self.items)?;
        fs::write(&self.path, json).map_err(|source| TaskboardError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
