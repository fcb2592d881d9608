//! Configuration handling for the Shortcut CLI
//!
//! Configuration is a single JSON document, `config.json`, in the per-user
//! config directory (or `$SHORTCUT_CONFIG_DIR`). It holds the API token, the
//! caller's mention name and workspace URL slug, and saved search
//! workspaces. Keys this tool does not know about are kept as they are.
//!
//! Environment variables override the stored token and identifiers for a
//! single run; they are never written back.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::ListOptions;

const CONFIG_FILE: &str = "config.json";

pub const CONFIG_DIR_ENV: &str = "SHORTCUT_CONFIG_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine the config directory")]
    NoConfigDir,

    #[error("Failed to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write config {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No workspace saved with name '{0}'")]
    UnknownWorkspace(String),
}

/// The stored configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_slug: Option<String>,

    /// Saved search option bundles by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub workspaces: BTreeMap<String, ListOptions>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Config {
    /// Applies environment overrides for this run
    pub fn with_env(mut self, env: &EnvOverrides) -> Self {
        if let Some(token) = &env.token {
            self.token = Some(token.clone());
        }
        if let Some(mention) = &env.mention_name {
            self.mention_name = Some(mention.clone());
        }
        if let Some(slug) = &env.url_slug {
            self.url_slug = Some(slug.clone());
        }
        self
    }

    /// The token, if one is configured and non-empty
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn mention_name(&self) -> &str {
        self.mention_name.as_deref().unwrap_or_default()
    }

    pub fn url_slug(&self) -> &str {
        self.url_slug.as_deref().unwrap_or_default()
    }

    pub fn workspace(&self, name: &str) -> Result<&ListOptions, ConfigError> {
        self.workspaces
            .get(name)
            .ok_or_else(|| ConfigError::UnknownWorkspace(name.to_string()))
    }
}

/// Values taken from the environment for a single run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub token: Option<String>,
    pub mention_name: Option<String>,
    pub url_slug: Option<String>,
    pub api_url: Option<String>,
    pub app_url: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            token: var("SHORTCUT_API_TOKEN").or_else(|| var("CLUBHOUSE_API_TOKEN")),
            mention_name: var("SHORTCUT_MENTION_NAME"),
            url_slug: var("SHORTCUT_URL_SLUG"),
            api_url: var("SHORTCUT_API_URL"),
            app_url: var("SHORTCUT_APP_URL"),
        }
    }
}

/// Reads and writes the configuration document
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    legacy_path: Option<PathBuf>,
}

impl ConfigStore {
    /// Store in the default location
    pub fn locate() -> Result<Self, ConfigError> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => ProjectDirs::from("", "", "short-cli")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or(ConfigError::NoConfigDir)?,
        };
        let legacy_path = BaseDirs::new()
            .map(|base| base.home_dir().join(".clubhouse-cli").join(CONFIG_FILE));

        Ok(Self {
            path: dir.join(CONFIG_FILE),
            legacy_path,
        })
    }

    /// Store rooted at `dir`, with an optional legacy file to migrate from
    pub fn in_dir(dir: &Path, legacy_path: Option<PathBuf>) -> Self {
        Self {
            path: dir.join(CONFIG_FILE),
            legacy_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored document; a missing file is an empty config.
    ///
    /// A config left at the legacy location is moved into place first.
    pub fn load(&self) -> Result<Config, ConfigError> {
        self.relocate_legacy()?;

        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no config file");
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes the whole document (temp file + rename)
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(write_err)?;
        }

        let content = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;
        tracing::debug!(path = %self.path.display(), "saved config");
        Ok(())
    }

    /// Merges `update` into the stored document
    pub fn update<F>(&self, update: F) -> Result<Config, ConfigError>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update(&mut config);
        self.save(&config)?;
        Ok(config)
    }

    pub fn save_workspace(&self, name: &str, options: &ListOptions) -> Result<(), ConfigError> {
        self.update(|c| {
            c.workspaces.insert(name.to_string(), options.clone());
        })
        .map(|_| ())
    }

    /// Removes a saved workspace; returns false if it did not exist
    pub fn remove_workspace(&self, name: &str) -> Result<bool, ConfigError> {
        let mut removed = false;
        self.update(|c| removed = c.workspaces.remove(name).is_some())?;
        Ok(removed)
    }

    fn relocate_legacy(&self) -> Result<(), ConfigError> {
        let legacy = match &self.legacy_path {
            Some(legacy) if legacy.exists() && !self.path.exists() => legacy,
            _ => return Ok(()),
        };

        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(write_err)?;
        }

        // rename fails across filesystems; fall back to copy + remove
        if fs::rename(legacy, &self.path).is_err() {
            fs::copy(legacy, &self.path).map_err(write_err)?;
            if let Err(e) = fs::remove_file(legacy) {
                tracing::warn!(
                    path = %legacy.display(),
                    error = %e,
                    "could not remove legacy config"
                );
            }
        }
        tracing::info!(
            from = %legacy.display(),
            to = %self.path.display(),
            "moved legacy config"
        );
        Ok(())
    }
}
