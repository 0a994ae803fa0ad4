use sk_browser::DecodedImage;
use sk_browser::ImageDecoder;
use sk_core::BrowserError;
use sk_core::BrowserResult;

/// Decoder backed by the `image` crate.
///
/// Output is always RGBA8 with rows flipped bottom-to-top; the egui surface
/// samples with an inverted UV rectangle to compensate.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterDecoder;

impl ImageDecoder for RasterDecoder {
    fn decode(&self, bytes: &[u8]) -> BrowserResult<DecodedImage> {
        let decoded = image::load_from_memory(bytes).map_err(|error| {
            BrowserError::new("image.decode_failed", format!("cannot decode image: {error}"))
        })?;

        let rgba = decoded.flipv().to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(DecodedImage {
            rgba: rgba.into_raw(),
            width,
            height,
        })
    }
}
