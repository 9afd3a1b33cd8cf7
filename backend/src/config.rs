//! Engine configuration.
//!
//! Values come from the environment (a `.env` file is honoured via
//! `dotenvy`), and CLI flags may override them:
//!
//! | Variable               | Default          |
//! |------------------------|------------------|
//! | `GRIDFORM_DATA_DIR`    | `.gridform`      |
//! | `GRIDFORM_STORAGE_KEY` | `savedGridData`  |
//! | `GRIDFORM_PORT`        | `3000`           |

use std::path::PathBuf;

use crate::store::{DEFAULT_DATA_DIR, DEFAULT_STORAGE_KEY};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

pub const ENV_DATA_DIR: &str = "GRIDFORM_DATA_DIR";
pub const ENV_STORAGE_KEY: &str = "GRIDFORM_STORAGE_KEY";
pub const ENV_PORT: &str = "GRIDFORM_PORT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory for the file-backed store.
    pub data_dir: PathBuf,
    /// Single key the dataset snapshot lives under.
    pub storage_key: String,
    /// HTTP port for `serve`.
    pub port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl EngineConfig {
    /// Load `.env` (if present) and read the environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Unset, empty or unparsable
    /// values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            data_dir: get(ENV_DATA_DIR).map(PathBuf::from).unwrap_or(defaults.data_dir),
            storage_key: get(ENV_STORAGE_KEY).unwrap_or(defaults.storage_key),
            port: get(ENV_PORT)
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    /// Apply CLI overrides.
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        storage_key: Option<String>,
        port: Option<u16>,
    ) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(key) = storage_key {
            self.storage_key = key;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }
}
