use eframe::egui;
use sk_browser::DecodedImage;
use sk_browser::TextureUploader;
use sk_core::BrowserError;
use sk_core::BrowserResult;

/// Uploads decoded images as egui textures.
///
/// Textures are freed when their handle drops, so releasing is just dropping.
pub struct EguiUploader {
    ctx: egui::Context,
}

impl EguiUploader {
    pub fn new(ctx: egui::Context) -> Self {
        Self { ctx }
    }
}

fn texture_options() -> egui::TextureOptions {
    egui::TextureOptions::LINEAR.with_mipmap_mode(Some(egui::TextureFilter::Linear))
}

impl TextureUploader for EguiUploader {
    type Handle = egui::TextureHandle;

    fn upload(&mut self, url: &str, image: &DecodedImage) -> BrowserResult<egui::TextureHandle> {
        let size = [image.width, image.height].map(|side| usize::try_from(side).unwrap_or(0));
        let expected = size[0]
            .checked_mul(size[1])
            .and_then(|pixels| pixels.checked_mul(4));
        if expected != Some(image.rgba.len()) {
            return Err(BrowserError::new(
                "image.upload_failed",
                format!("pixel buffer for {url} does not match {}x{}", image.width, image.height),
            ));
        }

        let pixels = egui::ColorImage::from_rgba_unmultiplied(size, &image.rgba);
        Ok(self
            .ctx
            .load_texture(format!("img:{url}"), pixels, texture_options()))
    }

    fn release(&mut self, handle: egui::TextureHandle) {
        log::debug!("releasing texture {}", handle.name());
        drop(handle);
    }
}
