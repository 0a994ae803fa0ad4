//! Surface that records draw calls instead of drawing.

use crate::surface::Bounds;
use crate::surface::Color;
use crate::surface::DrawSurface;
use crate::surface::FontStyle;
use crate::surface::LinkResponse;

const LINE_HEIGHT: f32 = 16.0;
const GLYPH_WIDTH: f32 = 8.0;

/// One primitive emitted through [`DrawSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall<T> {
    Text(String),
    ColoredText(String, Color),
    Image { texture: T, width: u32, height: u32 },
    Link { id: String, label: String },
    Underline(Bounds, Color),
    PushFont(FontStyle),
    PopFont,
    PushColor(Color),
    PopColor,
    PushWrap,
    PopWrap,
    NewLine,
    HorizontalRule,
}

/// [`DrawSurface`] that appends every call to a list.
///
/// Layout is a fixed monospace grid so link bounds are deterministic. A link
/// whose label equals the configured click target reports a click.
#[derive(Debug, Clone)]
pub struct RecordingSurface<T> {
    calls: Vec<DrawCall<T>>,
    click_label: Option<String>,
    cursor_x: f32,
    line: u32,
}

impl<T> Default for RecordingSurface<T> {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            click_label: None,
            cursor_x: 0.0,
            line: 0,
        }
    }
}

impl<T> RecordingSurface<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface on which the link labelled `label` is clicked.
    pub fn clicking(label: impl Into<String>) -> Self {
        Self {
            click_label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> &[DrawCall<T>] {
        &self.calls
    }

    pub fn into_calls(self) -> Vec<DrawCall<T>> {
        self.calls
    }

    /// True when every font, color and wrap push has a matching pop and no
    /// pop ever happens on an empty stack.
    pub fn is_balanced(&self) -> bool {
        let mut depths = [0_i64; 3];
        for call in &self.calls {
            let (slot, delta) = match call {
                DrawCall::PushFont(_) => (0, 1),
                DrawCall::PopFont => (0, -1),
                DrawCall::PushColor(_) => (1, 1),
                DrawCall::PopColor => (1, -1),
                DrawCall::PushWrap => (2, 1),
                DrawCall::PopWrap => (2, -1),
                _ => continue,
            };
            depths[slot] += delta;
            if depths[slot] < 0 {
                return false;
            }
        }
        depths.iter().all(|depth| *depth == 0)
    }

    fn advance(&mut self, chars: usize) -> Bounds {
        let width = chars as f32 * GLYPH_WIDTH;
        let min_y = self.line as f32 * LINE_HEIGHT;
        let bounds = Bounds {
            min_x: self.cursor_x,
            min_y,
            max_x: self.cursor_x + width,
            max_y: min_y + LINE_HEIGHT,
        };
        self.cursor_x += width;
        bounds
    }

    fn break_line(&mut self) {
        self.cursor_x = 0.0;
        self.line += 1;
    }
}

impl<T: Clone> DrawSurface for RecordingSurface<T> {
    type Texture = T;

    fn text(&mut self, text: &str) {
        self.advance(text.chars().count());
        self.calls.push(DrawCall::Text(text.to_owned()));
    }

    fn colored_text(&mut self, text: &str, color: Color) {
        self.advance(text.chars().count());
        self.calls.push(DrawCall::ColoredText(text.to_owned(), color));
    }

    fn image(&mut self, texture: &T, width: u32, height: u32) {
        self.calls.push(DrawCall::Image {
            texture: texture.clone(),
            width,
            height,
        });
    }

    fn clickable_text(&mut self, id: &str, label: &str) -> LinkResponse {
        let bounds = self.advance(label.chars().count());
        self.calls.push(DrawCall::Link {
            id: id.to_owned(),
            label: label.to_owned(),
        });
        LinkResponse {
            clicked: self.click_label.as_deref() == Some(label),
            bounds,
        }
    }

    fn underline(&mut self, bounds: Bounds, color: Color) {
        self.calls.push(DrawCall::Underline(bounds, color));
    }

    fn push_font(&mut self, font: FontStyle) {
        self.calls.push(DrawCall::PushFont(font));
    }

    fn pop_font(&mut self) {
        self.calls.push(DrawCall::PopFont);
    }

    fn push_color(&mut self, color: Color) {
        self.calls.push(DrawCall::PushColor(color));
    }

    fn pop_color(&mut self) {
        self.calls.push(DrawCall::PopColor);
    }

    fn push_wrap(&mut self) {
        self.calls.push(DrawCall::PushWrap);
    }

    fn pop_wrap(&mut self) {
        self.calls.push(DrawCall::PopWrap);
    }

    fn new_line(&mut self) {
        self.break_line();
        self.calls.push(DrawCall::NewLine);
    }

    fn horizontal_rule(&mut self) {
        self.break_line();
        self.calls.push(DrawCall::HorizontalRule);
    }
}
