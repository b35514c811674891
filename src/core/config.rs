//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::actor::{Actor, Role};
use crate::core::store::DEFAULT_BATCH_LIMIT;

/// Name of the per-directory configuration folder
pub const LOCAL_DIR: &str = ".qms";

/// QMS configuration with layered hierarchy
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name stamped on Activity Log entries
    pub author: Option<String>,

    /// Role stamped on Activity Log entries
    pub role: Option<Role>,

    /// Directory holding the Local Cache database
    pub data_dir: Option<PathBuf>,

    /// Root of the file-backed Remote Store; unset means no remote
    pub remote_dir: Option<PathBuf>,

    /// Maximum writes per remote batch
    pub batch_limit: Option<usize>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/qms/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Local config (./.qms/config.yaml)
        if let Ok(cwd) = std::env::current_dir() {
            if let Some(local) = Self::read_file(&cwd.join(LOCAL_DIR).join("config.yaml")) {
                config.merge(local);
            }
        }

        // 4. Environment variables
        config.merge(Self::from_env(|name| std::env::var(name).ok()));

        config
    }

    /// Parse one YAML layer; a missing or malformed file contributes nothing
    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
                None
            }
        }
    }

    /// Build the environment layer from a variable lookup
    fn from_env(var: impl Fn(&str) -> Option<String>) -> Config {
        Config {
            author: var("QMS_AUTHOR").filter(|s| !s.is_empty()),
            role: var("QMS_ROLE").and_then(|s| s.parse().ok()),
            data_dir: var("QMS_DATA_DIR").filter(|s| !s.is_empty()).map(PathBuf::from),
            remote_dir: var("QMS_REMOTE_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            batch_limit: var("QMS_BATCH_LIMIT").and_then(|s| s.parse().ok()),
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "qms")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.role.is_some() {
            self.role = other.role;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.remote_dir.is_some() {
            self.remote_dir = other.remote_dir;
        }
        if other.batch_limit.is_some() {
            self.batch_limit = other.batch_limit;
        }
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        // Try git config
        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        // Fall back to username
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    pub fn role(&self) -> Role {
        self.role.unwrap_or_default()
    }

    /// The actor mutations are attributed to
    pub fn actor(&self) -> Actor {
        Actor::new(self.author(), self.role())
    }

    /// Directory of the Local Cache, defaulting to the platform data dir
    pub fn data_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.data_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("", "", "qms")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(LOCAL_DIR))
    }

    pub fn batch_limit(&self) -> usize {
        self.batch_limit
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_BATCH_LIMIT)
    }
}
