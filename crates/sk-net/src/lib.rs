//! Networking: URL reference resolution and blocking HTTP fetches.

pub mod client;
pub mod fetch;
pub mod http;
pub mod resolve;
pub mod tls;
pub mod transport;

pub use client::HttpFetcher;
pub use fetch::DEFAULT_MAX_REDIRECTS;
pub use fetch::DEFAULT_USER_AGENT;
pub use fetch::FetchOptions;
pub use fetch::FetchedResponse;
pub use fetch::Fetcher;
pub use resolve::resolve;
