//! Browser configuration loaded from `skiff.toml`.

use serde::Deserialize;
use sk_core::BrowserError;
use sk_core::BrowserResult;
use sk_net::DEFAULT_MAX_REDIRECTS;
use sk_net::DEFAULT_USER_AGENT;
use sk_net::FetchOptions;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

/// File looked up in the working directory at start-up.
pub const CONFIG_FILE_NAME: &str = "skiff.toml";

pub const DEFAULT_HOME_URL: &str = "https://news.ycombinator.com";
pub const DEFAULT_IMAGE_TIMEOUT_MS: u64 = 5_000;

/// User-tunable settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Page opened at start-up.
    pub home_url: String,
    pub user_agent: String,
    /// Bound on each image fetch. Page fetches are unbounded.
    pub image_timeout_ms: u64,
    pub max_redirects: usize,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            home_url: DEFAULT_HOME_URL.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            image_timeout_ms: DEFAULT_IMAGE_TIMEOUT_MS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            window_width: 1280,
            window_height: 720,
        }
    }
}

impl BrowserConfig {
    pub fn from_toml_str(text: &str) -> BrowserResult<Self> {
        toml::from_str(text).map_err(|error| {
            BrowserError::new(
                "config.parse_failed",
                format!("invalid browser configuration: {error}"),
            )
        })
    }

    /// Reads `path`. A missing file is not an error and yields defaults.
    pub fn load(path: &Path) -> BrowserResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                log::debug!("{} not found, using default configuration", path.display());
                Ok(Self::default())
            }
            Err(error) => Err(BrowserError::new(
                "config.read_failed",
                format!("failed to read `{}`: {error}", path.display()),
            )),
        }
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }

    pub fn page_fetch_options(&self) -> FetchOptions {
        FetchOptions::default()
            .with_user_agent(self.user_agent.clone())
            .with_max_redirects(self.max_redirects)
    }

    pub fn image_fetch_options(&self) -> FetchOptions {
        self.page_fetch_options().with_timeout(self.image_timeout())
    }
}
