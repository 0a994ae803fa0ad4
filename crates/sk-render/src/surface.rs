//! Drawing-surface contract consumed by the renderer.

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Link label and underline color.
pub const LINK_COLOR: Color = Color::rgb(0, 0, 255);

/// Color of the "image still loading" placeholder.
pub const PLACEHOLDER_COLOR: Color = Color::rgb(255, 0, 0);

/// Font variants the renderer can push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Heading,
    Bold,
    Italic,
}

/// Axis-aligned rectangle in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

/// Result of drawing a clickable region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinkResponse {
    pub clicked: bool,
    pub bounds: Bounds,
}

/// Immediate-mode primitives the renderer emits.
///
/// Push/pop pairs nest; the renderer guarantees every push is matched by
/// exactly one pop before the branch that pushed returns.
pub trait DrawSurface {
    /// Opaque handle of an uploaded image.
    type Texture;

    /// Inline text on the current line.
    fn text(&mut self, text: &str);
    fn colored_text(&mut self, text: &str, color: Color);
    /// Blits `texture` at `width` x `height` pixels.
    fn image(&mut self, texture: &Self::Texture, width: u32, height: u32);
    /// Clickable text. `id` disambiguates regions that share a label.
    fn clickable_text(&mut self, id: &str, label: &str) -> LinkResponse;
    /// Line along the bottom edge of `bounds`.
    fn underline(&mut self, bounds: Bounds, color: Color);
    fn push_font(&mut self, font: FontStyle);
    fn pop_font(&mut self);
    fn push_color(&mut self, color: Color);
    fn pop_color(&mut self);
    /// Enables soft wrapping at the available width.
    fn push_wrap(&mut self);
    fn pop_wrap(&mut self);
    fn new_line(&mut self);
    fn horizontal_rule(&mut self);
}

/// A decoded image the renderer can draw.
#[derive(Debug)]
pub struct ImageRef<'a, T> {
    pub texture: &'a T,
    pub width: u32,
    pub height: u32,
}

/// Read-only view of loaded images keyed by resolved URL.
pub trait ImageLookup {
    type Texture;

    fn image(&self, url: &str) -> Option<ImageRef<'_, Self::Texture>>;
}
