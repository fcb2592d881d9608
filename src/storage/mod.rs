//! # Storage Layer
//!
//! Local state is a single JSON document:
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Token, mention name, URL slug | JSON | `<config dir>/short-cli/config.json` |
//! | Saved workspaces | JSON (same file) | `workspaces` key |
//!
//! Writes replace the whole document via temp file + rename; the last
//! writer wins.

mod config;

pub use config::{Config, ConfigError, ConfigStore, EnvOverrides, CONFIG_DIR_ENV};
