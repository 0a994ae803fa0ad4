//! Shared primitives used across Skiff crates.

/// Result alias used across the workspace.
pub type BrowserResult<T> = Result<T, BrowserError>;

/// Error value carried by every fallible collaborator.
///
/// `code` is a dotted, machine-readable category (`net.fetch.status`,
/// `image.decode_failed`, ...); `message` is the human-readable detail shown
/// in logs and error pages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct BrowserError {
    pub code: &'static str,
    pub message: String,
}

impl BrowserError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// True when the code sits under `prefix` (`"net"` matches `net.http.read_failed`).
    pub fn is_in(&self, prefix: &str) -> bool {
        self.code
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    }
}
