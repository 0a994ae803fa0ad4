//! egui implementation of the renderer's drawing surface.
//!
//! The whole document is drawn into a single `horizontal_wrapped` layout so
//! inline runs flow left to right; `new_line` ends the current row.

use eframe::egui;
use sk_render::Bounds;
use sk_render::Color;
use sk_render::DrawSurface;
use sk_render::FontStyle;
use sk_render::LinkResponse;

const RULE_HEIGHT: f32 = 6.0;
const RULE_COLOR: egui::Color32 = egui::Color32::from_gray(96);

/// Rows of decoded images are stored bottom-up.
const FLIPPED_UV: egui::Rect = egui::Rect::from_min_max(egui::pos2(0.0, 1.0), egui::pos2(1.0, 0.0));

pub struct EguiSurface<'u> {
    ui: &'u mut egui::Ui,
    fonts: Vec<FontStyle>,
    colors: Vec<egui::Color32>,
    wrap_depth: usize,
}

impl<'u> EguiSurface<'u> {
    pub fn new(ui: &'u mut egui::Ui) -> Self {
        Self {
            ui,
            fonts: Vec::new(),
            colors: Vec::new(),
            wrap_depth: 0,
        }
    }

    fn rich(&self, text: &str) -> egui::RichText {
        let mut rich = egui::RichText::new(text);
        for font in &self.fonts {
            rich = match font {
                FontStyle::Heading => rich.heading(),
                FontStyle::Bold => rich.strong(),
                FontStyle::Italic => rich.italics(),
            };
        }
        if let Some(color) = self.colors.last() {
            rich = rich.color(*color);
        }
        rich
    }

    fn label(&self, rich: egui::RichText) -> egui::Label {
        let wrap = if self.wrap_depth > 0 {
            egui::TextWrapMode::Wrap
        } else {
            egui::TextWrapMode::Extend
        };
        egui::Label::new(rich).wrap_mode(wrap)
    }
}

fn color32(color: Color) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

impl DrawSurface for EguiSurface<'_> {
    type Texture = egui::TextureHandle;

    fn text(&mut self, text: &str) {
        let label = self.label(self.rich(text));
        self.ui.add(label);
    }

    fn colored_text(&mut self, text: &str, color: Color) {
        let label = self.label(self.rich(text).color(color32(color)));
        self.ui.add(label);
    }

    fn image(&mut self, texture: &egui::TextureHandle, width: u32, height: u32) {
        let size = egui::vec2(width as f32, height as f32);
        self.ui
            .add(egui::Image::new((texture.id(), size)).uv(FLIPPED_UV));
    }

    fn clickable_text(&mut self, id: &str, label: &str) -> LinkResponse {
        let widget = self.label(self.rich(label)).sense(egui::Sense::click());
        let response = self
            .ui
            .add(widget)
            .on_hover_cursor(egui::CursorIcon::PointingHand)
            .on_hover_text(id);
        LinkResponse {
            clicked: response.clicked(),
            bounds: Bounds {
                min_x: response.rect.min.x,
                min_y: response.rect.min.y,
                max_x: response.rect.max.x,
                max_y: response.rect.max.y,
            },
        }
    }

    fn underline(&mut self, bounds: Bounds, color: Color) {
        self.ui.painter().line_segment(
            [
                egui::pos2(bounds.min_x, bounds.max_y),
                egui::pos2(bounds.max_x, bounds.max_y),
            ],
            egui::Stroke::new(1.0, color32(color)),
        );
    }

    fn push_font(&mut self, font: FontStyle) {
        self.fonts.push(font);
    }

    fn pop_font(&mut self) {
        self.fonts.pop();
    }

    fn push_color(&mut self, color: Color) {
        self.colors.push(color32(color));
    }

    fn pop_color(&mut self) {
        self.colors.pop();
    }

    fn push_wrap(&mut self) {
        self.wrap_depth += 1;
    }

    fn pop_wrap(&mut self) {
        self.wrap_depth = self.wrap_depth.saturating_sub(1);
    }

    fn new_line(&mut self) {
        self.ui.end_row();
    }

    fn horizontal_rule(&mut self) {
        self.ui.end_row();
        let width = self.ui.available_width().max(1.0);
        let (rect, _) = self
            .ui
            .allocate_exact_size(egui::vec2(width, RULE_HEIGHT), egui::Sense::hover());
        let y = rect.center().y;
        self.ui.painter().line_segment(
            [egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)],
            egui::Stroke::new(1.0, RULE_COLOR),
        );
        self.ui.end_row();
    }
}
