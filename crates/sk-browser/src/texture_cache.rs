//! Decoded images keyed by resolved URL.
//!
//! Loading is split in three steps so the slow part can leave the UI thread:
//! [`TextureCache::begin`] claims a URL, [`ImageJob::run`] fetches and decodes
//! it anywhere, and [`TextureCache::complete`] uploads the pixels. A job
//! begun before the last [`TextureCache::clear`] or
//! [`TextureCache::release_pending`] is discarded on completion.

use sk_core::BrowserError;
use sk_core::BrowserResult;
use sk_net::FetchOptions;
use sk_net::Fetcher;
use sk_render::ImageLookup;
use sk_render::ImageRef;
use std::collections::HashMap;
use std::collections::HashSet;

/// Extensions rejected before any network traffic.
const UNSUPPORTED_EXTENSIONS: [&str; 2] = ["svg", "gif"];

/// Uploaded image owned by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry<H> {
    pub handle: H,
    pub width: u32,
    pub height: u32,
}

/// Tightly packed RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Turns encoded bytes into RGBA pixels.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> BrowserResult<DecodedImage>;
}

/// Moves pixels to the GPU and back.
pub trait TextureUploader {
    type Handle;

    fn upload(&mut self, url: &str, image: &DecodedImage) -> BrowserResult<Self::Handle>;
    fn release(&mut self, handle: Self::Handle);
}

/// Claim on one URL, runnable off the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    url: String,
    generation: u64,
}

impl ImageJob {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches and decodes the image. Blocks for at most the fetch timeout
    /// plus decode time.
    pub fn run(
        self,
        fetcher: &dyn Fetcher,
        options: &FetchOptions,
        decoder: &dyn ImageDecoder,
    ) -> ImageJobResult {
        let outcome = fetch_and_decode(&self.url, fetcher, options, decoder);
        ImageJobResult {
            url: self.url,
            generation: self.generation,
            outcome,
        }
    }
}

/// Output of [`ImageJob::run`], handed back to [`TextureCache::complete`].
#[derive(Debug)]
pub struct ImageJobResult {
    url: String,
    generation: u64,
    outcome: BrowserResult<DecodedImage>,
}

impl ImageJobResult {
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Per-page image store.
#[derive(Debug)]
pub struct TextureCache<H> {
    entries: HashMap<String, ImageEntry<H>>,
    /// URLs that failed since the last clear. They are not retried.
    failed: HashSet<String>,
    pending: HashSet<String>,
    generation: u64,
}

impl<H> Default for TextureCache<H> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            failed: HashSet::new(),
            pending: HashSet::new(),
            generation: 0,
        }
    }
}

impl<H> TextureCache<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&ImageEntry<H>> {
        self.entries.get(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bumped by [`TextureCache::clear`] and [`TextureCache::release_pending`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Loads `url` inline unless it is cached or already failed. Returns
    /// whether the image is available afterwards.
    pub fn ensure<U>(
        &mut self,
        url: &str,
        fetcher: &dyn Fetcher,
        options: &FetchOptions,
        decoder: &dyn ImageDecoder,
        uploader: &mut U,
    ) -> bool
    where
        U: TextureUploader<Handle = H>,
    {
        match self.begin(url) {
            Some(job) => self.complete(job.run(fetcher, options, decoder), uploader),
            None => self.contains(url),
        }
    }

    /// Claims `url` for loading. `None` when it is cached, pending, has
    /// already failed, or is rejected by policy.
    pub fn begin(&mut self, url: &str) -> Option<ImageJob> {
        if self.entries.contains_key(url) {
            log::debug!("image cache hit: {url}");
            return None;
        }
        if self.pending.contains(url) || self.failed.contains(url) {
            return None;
        }

        if let Err(error) = check_policy(url) {
            log::warn!("skipping image {url}: {error}");
            self.failed.insert(url.to_owned());
            return None;
        }

        self.pending.insert(url.to_owned());
        Some(ImageJob {
            url: url.to_owned(),
            generation: self.generation,
        })
    }

    /// Uploads a finished job. Returns whether the image was inserted.
    pub fn complete<U>(&mut self, result: ImageJobResult, uploader: &mut U) -> bool
    where
        U: TextureUploader<Handle = H>,
    {
        if result.generation != self.generation {
            log::debug!("dropping image from a previous page: {}", result.url);
            return false;
        }
        self.pending.remove(&result.url);

        let uploaded = result.outcome.and_then(|image| {
            let handle = uploader.upload(&result.url, &image)?;
            Ok(ImageEntry {
                handle,
                width: image.width,
                height: image.height,
            })
        });

        match uploaded {
            Ok(entry) => {
                log::info!(
                    "loaded image {} ({}x{})",
                    result.url,
                    entry.width,
                    entry.height
                );
                self.entries.insert(result.url, entry);
                true
            }
            Err(error) => {
                log::warn!("failed to load image {}: {error}", result.url);
                self.failed.insert(result.url);
                false
            }
        }
    }

    /// Releases every handle and forgets failures. Jobs begun before this
    /// call are discarded when they complete.
    pub fn clear<U>(&mut self, uploader: &mut U)
    where
        U: TextureUploader<Handle = H>,
    {
        for (_, entry) in self.entries.drain() {
            uploader.release(entry.handle);
        }
        self.failed.clear();
        self.release_pending();
    }

    /// Drops every outstanding claim while keeping loaded images. Jobs begun
    /// before this call are discarded when they complete, and their URLs can
    /// be claimed again.
    pub fn release_pending(&mut self) {
        self.pending.clear();
        self.generation += 1;
    }
}

impl<H> ImageLookup for TextureCache<H> {
    type Texture = H;

    fn image(&self, url: &str) -> Option<ImageRef<'_, H>> {
        self.entries.get(url).map(|entry| ImageRef {
            texture: &entry.handle,
            width: entry.width,
            height: entry.height,
        })
    }
}

fn check_policy(url: &str) -> BrowserResult<()> {
    if !url.contains("://") {
        return Err(BrowserError::new(
            "image.url_not_absolute",
            format!("`{url}` is not an absolute URL"),
        ));
    }

    let unsupported =
        path_extension(url).filter(|extension| UNSUPPORTED_EXTENSIONS.contains(extension));
    if let Some(extension) = unsupported {
        return Err(BrowserError::new(
            "image.format_unsupported",
            format!("`.{extension}` images are not supported"),
        ));
    }

    Ok(())
}

/// Text after the last `.` of the final path segment, ignoring any query or
/// fragment. Case is preserved.
fn path_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    segment.rsplit_once('.').map(|(_, extension)| extension)
}

fn fetch_and_decode(
    url: &str,
    fetcher: &dyn Fetcher,
    options: &FetchOptions,
    decoder: &dyn ImageDecoder,
) -> BrowserResult<DecodedImage> {
    let response = fetcher.fetch(url, options)?;
    if !response.is_ok() {
        return Err(BrowserError::new(
            "net.fetch.status",
            format!("server answered {}", response.status_code),
        ));
    }
    if response.body.is_empty() {
        return Err(BrowserError::new("net.fetch.empty_body", "response body is empty"));
    }

    let image = decoder.decode(&response.body)?;
    if image.width == 0 || image.height == 0 {
        return Err(BrowserError::new(
            "image.dimensions_invalid",
            format!("decoded size {}x{} is empty", image.width, image.height),
        ));
    }

    let expected = image.width as usize * image.height as usize * 4;
    if image.rgba.len() != expected {
        return Err(BrowserError::new(
            "image.buffer_size_mismatch",
            format!(
                "expected {expected} RGBA bytes for {}x{}, got {}",
                image.width,
                image.height,
                image.rgba.len()
            ),
        ));
    }

    Ok(image)
}
