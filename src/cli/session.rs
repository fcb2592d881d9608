//! Per-run context: configuration, links and API access
//!
//! Loaded once at startup and passed to every command that talks to the
//! service.

use anyhow::{Context, Result};

use super::failure::Failure;
use crate::api::{fetch_entities, ShortcutClient, DEFAULT_API_URL};
use crate::domain::links::DEFAULT_APP_URL;
use crate::domain::{AppLinks, Entities};
use crate::storage::{Config, ConfigStore, EnvOverrides};

pub struct Session {
    store: ConfigStore,
    config: Config,
    env: EnvOverrides,
    links: AppLinks,
}

impl Session {
    pub fn load() -> Result<Self> {
        let store = ConfigStore::locate()?;
        let env = EnvOverrides::from_env();
        Self::from_parts(store, env)
    }

    pub fn from_parts(store: ConfigStore, env: EnvOverrides) -> Result<Self> {
        let config = store.load()?.with_env(&env);
        let app_url = env.app_url.as_deref().unwrap_or(DEFAULT_APP_URL);
        let links = AppLinks::new(app_url, config.url_slug());
        tracing::debug!(path = %store.path().display(), "loaded config");

        Ok(Self {
            store,
            config,
            env,
            links,
        })
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn links(&self) -> &AppLinks {
        &self.links
    }

    pub fn mention_name(&self) -> &str {
        self.config.mention_name()
    }

    pub fn api_url(&self) -> &str {
        self.env.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    /// A client for an explicit token, used while installing
    pub fn client_for(&self, token: &str) -> Result<ShortcutClient> {
        Ok(ShortcutClient::new(self.api_url(), token)?)
    }

    /// A client authenticated with the configured token
    pub fn client(&self) -> Result<ShortcutClient> {
        let token = self
            .config
            .token()
            .context("Not installed yet. Please run: short install")?;
        self.client_for(token)
    }

    /// Fetches the entity bundle; any failure aborts the command
    pub async fn entities(&self, client: &ShortcutClient) -> Result<Entities> {
        fetch_entities(client).await.context(Failure::Entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session(dir: &TempDir, env: EnvOverrides) -> Session {
        Session::from_parts(ConfigStore::in_dir(dir.path(), None), env).unwrap()
    }

    #[test]
    fn missing_token_asks_for_install() {
        let dir = TempDir::new().unwrap();
        let err = session(&dir, EnvOverrides::default()).client().unwrap_err();
        assert!(err.to_string().contains("short install"));
    }

    #[test]
    fn env_token_and_urls_apply() {
        let dir = TempDir::new().unwrap();
        let session = session(
            &dir,
            EnvOverrides {
                token: Some("tok".to_string()),
                url_slug: Some("acme".to_string()),
                api_url: Some("http://localhost:9999/api/v3".to_string()),
                app_url: Some("http://localhost:8080".to_string()),
                ..Default::default()
            },
        );

        assert!(session.client().is_ok());
        assert_eq!(session.api_url(), "http://localhost:9999/api/v3");
        assert_eq!(session.links().story(5), "http://localhost:8080/acme/story/5");
    }

    #[test]
    fn defaults_point_at_the_service() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir, EnvOverrides::default());
        assert_eq!(session.api_url(), DEFAULT_API_URL);
        assert_eq!(session.mention_name(), "");
    }
}
