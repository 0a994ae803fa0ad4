//! Browser state shared by every shell: configuration, history, the texture
//! cache and the page controller that ties them together.

pub mod config;
pub mod history;
pub mod page;
pub mod texture_cache;

#[cfg(test)]
mod testing;

pub use config::BrowserConfig;
pub use config::CONFIG_FILE_NAME;
pub use history::NavigationHistory;
pub use page::CurrentPage;
pub use page::NavigationKind;
pub use page::NavigationOutcome;
pub use page::NavigationTicket;
pub use page::PageController;
pub use page::PageLoad;
pub use texture_cache::DecodedImage;
pub use texture_cache::ImageDecoder;
pub use texture_cache::ImageEntry;
pub use texture_cache::ImageJob;
pub use texture_cache::ImageJobResult;
pub use texture_cache::TextureCache;
pub use texture_cache::TextureUploader;
