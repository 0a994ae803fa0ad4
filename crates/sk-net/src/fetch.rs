//! Fetch collaborator contract shared by page and image loading.

use sk_core::BrowserResult;
use std::time::Duration;

/// Client identifier sent with every request unless overridden.
pub const DEFAULT_USER_AGENT: &str = "Skiff/1.0";

/// Redirect hops followed before a fetch fails.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Blocking `url -> bytes` collaborator.
///
/// Implementations follow redirects and report transport failures as errors.
/// Status codes are returned, not judged: callers decide which statuses they
/// accept.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str, options: &FetchOptions) -> BrowserResult<FetchedResponse>;
}

/// Per-request knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// `None` blocks until the peer answers or closes.
    pub timeout: Option<Duration>,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl FetchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Response after redirects have been followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    pub final_url: String,
    pub status_code: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl FetchedResponse {
    /// Exactly `200 OK`.
    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }

    /// Body as text. Invalid UTF-8 sequences are replaced, never rejected.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
