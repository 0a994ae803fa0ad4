//! In-memory collaborators for unit tests.

use crate::texture_cache::DecodedImage;
use crate::texture_cache::ImageDecoder;
use crate::texture_cache::TextureUploader;
use sk_core::BrowserError;
use sk_core::BrowserResult;
use sk_net::FetchOptions;
use sk_net::FetchedResponse;
use sk_net::Fetcher;
use std::collections::HashMap;
use std::sync::Mutex;

/// Serves canned responses and records every requested URL. Unknown URLs
/// fail like an unreachable host.
#[derive(Debug, Default)]
pub struct MapFetcher {
    pages: HashMap<String, (u16, Vec<u8>)>,
    calls: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, status_code: u16, body: &[u8]) -> Self {
        self.pages
            .insert(url.to_owned(), (status_code, body.to_vec()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Fetcher for MapFetcher {
    fn fetch(&self, url: &str, _options: &FetchOptions) -> BrowserResult<FetchedResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_owned());
        }

        let (status_code, body) = self.pages.get(url).cloned().ok_or_else(|| {
            BrowserError::new("net.transport.connect_failed", format!("no route to {url}"))
        })?;
        Ok(FetchedResponse {
            final_url: url.to_owned(),
            status_code,
            content_type: String::new(),
            body,
        })
    }
}

/// Decodes `n` bytes into an `n`x1 black image.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubDecoder;

impl StubDecoder {
    pub const CORRUPT: &'static [u8] = b"corrupt";
    pub const ZERO_SIZED: &'static [u8] = b"zero";
}

impl ImageDecoder for StubDecoder {
    fn decode(&self, bytes: &[u8]) -> BrowserResult<DecodedImage> {
        if bytes == Self::CORRUPT {
            return Err(BrowserError::new("image.decode_failed", "corrupt stub image"));
        }
        if bytes == Self::ZERO_SIZED {
            return Ok(DecodedImage {
                rgba: Vec::new(),
                width: 0,
                height: 0,
            });
        }

        let width = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
        Ok(DecodedImage {
            rgba: vec![0; bytes.len() * 4],
            width,
            height: 1,
        })
    }
}

/// Hands out sequential handles starting at 1.
#[derive(Debug, Default)]
pub struct CountingUploader {
    pub uploads: Vec<String>,
    pub released: Vec<u32>,
    fail: bool,
}

impl CountingUploader {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl TextureUploader for CountingUploader {
    type Handle = u32;

    fn upload(&mut self, url: &str, _image: &DecodedImage) -> BrowserResult<u32> {
        if self.fail {
            return Err(BrowserError::new("image.upload_failed", "stub uploader refuses"));
        }
        self.uploads.push(url.to_owned());
        Ok(u32::try_from(self.uploads.len()).unwrap_or(u32::MAX))
    }

    fn release(&mut self, handle: u32) {
        self.released.push(handle);
    }
}
