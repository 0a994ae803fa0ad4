//! Document renderer: walks a parsed tree and emits drawing-surface calls.

#[cfg(any(test, feature = "testing"))]
pub mod recording;
pub mod surface;

use sk_dom::Document;
use sk_dom::Node;
use sk_dom::NodeId;
use sk_dom::TagKind;
use sk_net::resolve;

#[cfg(any(test, feature = "testing"))]
pub use recording::DrawCall;
#[cfg(any(test, feature = "testing"))]
pub use recording::RecordingSurface;
pub use surface::Bounds;
pub use surface::Color;
pub use surface::DrawSurface;
pub use surface::FontStyle;
pub use surface::ImageLookup;
pub use surface::ImageRef;
pub use surface::LINK_COLOR;
pub use surface::LinkResponse;
pub use surface::PLACEHOLDER_COLOR;

/// Elements nested deeper than this are not drawn.
const MAX_RENDER_DEPTH: usize = 512;

/// What the user asked for while a frame was drawn.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderAction {
    /// Resolved target of the last clicked link.
    pub navigate_to: Option<String>,
}

/// Per-frame inputs the renderer reads.
#[derive(Debug)]
pub struct RenderContext<'a, L> {
    /// URL links and images are resolved against.
    pub page_url: &'a str,
    pub images: &'a L,
}

struct Ctx<'a, L, S> {
    doc: &'a Document,
    page_url: &'a str,
    images: &'a L,
    surface: &'a mut S,
    action: RenderAction,
}

/// Draws `doc` onto `surface`.
pub fn render_document<L, S>(
    doc: &Document,
    context: &RenderContext<'_, L>,
    surface: &mut S,
) -> RenderAction
where
    L: ImageLookup,
    S: DrawSurface<Texture = L::Texture>,
{
    let mut ctx = Ctx {
        doc,
        page_url: context.page_url,
        images: context.images,
        surface,
        action: RenderAction::default(),
    };
    render_node(&mut ctx, Document::ROOT, 0);
    ctx.action
}

fn render_node<L, S>(ctx: &mut Ctx<'_, L, S>, id: NodeId, depth: usize)
where
    L: ImageLookup,
    S: DrawSurface<Texture = L::Texture>,
{
    let doc = ctx.doc;
    let Some(node) = doc.node(id) else {
        return;
    };
    if depth > MAX_RENDER_DEPTH {
        log::debug!("skipping <{}> nested {depth} levels deep", node.tag());
        return;
    }

    match node.kind() {
        TagKind::Text => ctx.surface.text(node.text()),
        TagKind::Paragraph => {
            ctx.surface.push_wrap();
            render_children(ctx, node, depth);
            ctx.surface.pop_wrap();
            ctx.surface.new_line();
        }
        TagKind::Heading1 => {
            ctx.surface.push_font(FontStyle::Heading);
            render_children(ctx, node, depth);
            ctx.surface.pop_font();
            ctx.surface.horizontal_rule();
        }
        TagKind::Heading2 => render_styled(ctx, node, depth, FontStyle::Heading),
        TagKind::Strong => render_styled(ctx, node, depth, FontStyle::Bold),
        TagKind::Emphasis => render_styled(ctx, node, depth, FontStyle::Italic),
        TagKind::Anchor => match node.attr("href") {
            Some(href) => render_link(ctx, id, href),
            None => render_children(ctx, node, depth),
        },
        TagKind::Image => match node.attr("src") {
            Some(src) => render_image(ctx, src),
            None => render_children(ctx, node, depth),
        },
        TagKind::Generic => render_children(ctx, node, depth),
    }
}

fn render_children<L, S>(ctx: &mut Ctx<'_, L, S>, node: &Node, depth: usize)
where
    L: ImageLookup,
    S: DrawSurface<Texture = L::Texture>,
{
    for child in node.children() {
        render_node(ctx, *child, depth + 1);
    }
}

fn render_styled<L, S>(ctx: &mut Ctx<'_, L, S>, node: &Node, depth: usize, font: FontStyle)
where
    L: ImageLookup,
    S: DrawSurface<Texture = L::Texture>,
{
    ctx.surface.push_font(font);
    render_children(ctx, node, depth);
    ctx.surface.pop_font();
}

fn render_link<L, S>(ctx: &mut Ctx<'_, L, S>, id: NodeId, href: &str)
where
    L: ImageLookup,
    S: DrawSurface<Texture = L::Texture>,
{
    let label = ctx.doc.text_content(id);
    if label.is_empty() {
        return;
    }

    ctx.surface.push_color(LINK_COLOR);
    let response = ctx.surface.clickable_text(href, &label);
    ctx.surface.underline(response.bounds, LINK_COLOR);
    ctx.surface.pop_color();

    if response.clicked {
        let target = resolve(ctx.page_url, href);
        if !target.is_empty() {
            ctx.action.navigate_to = Some(target);
        }
    }
}

fn render_image<L, S>(ctx: &mut Ctx<'_, L, S>, src: &str)
where
    L: ImageLookup,
    S: DrawSurface<Texture = L::Texture>,
{
    let url = resolve(ctx.page_url, src);
    match ctx.images.image(&url) {
        Some(image) => ctx.surface.image(image.texture, image.width, image.height),
        None => ctx
            .surface
            .colored_text(&format!("[Loading: {src}]"), PLACEHOLDER_COLOR),
    }
}
