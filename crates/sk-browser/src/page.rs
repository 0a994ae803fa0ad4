//! Page controller: navigation, history, image preloading and rendering.
//!
//! Navigation is split so the blocking fetch can run on a worker thread:
//! [`PageController::begin_navigation`] hands out a [`NavigationTicket`],
//! [`NavigationTicket::run`] performs the fetch anywhere, and
//! [`PageController::finish_navigation`] applies the result. Only the most
//! recently issued ticket is applied; older ones are dropped as stale.
//! [`PageController::navigate`] chains the three steps inline.

use crate::config::BrowserConfig;
use crate::history::NavigationHistory;
use crate::texture_cache::ImageDecoder;
use crate::texture_cache::ImageJob;
use crate::texture_cache::ImageJobResult;
use crate::texture_cache::TextureCache;
use crate::texture_cache::TextureUploader;
use sk_core::BrowserError;
use sk_core::BrowserResult;
use sk_dom::Document;
use sk_dom::TagKind;
use sk_html::HtmlParser;
use sk_net::FetchOptions;
use sk_net::Fetcher;
use sk_net::resolve;
use sk_render::DrawSurface;
use sk_render::RenderAction;
use sk_render::RenderContext;
use sk_render::render_document;

/// Prefix of the message shown when a page cannot be fetched.
pub const FETCH_FAILED_PREFIX: &str = "Failed to fetch URL";

/// The page currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentPage {
    url: String,
    document: Document,
}

impl CurrentPage {
    /// Resolved URL the page was requested with.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

/// How a navigation was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// Address bar or link click. Grows the history.
    Visit,
    Back,
    Forward,
}

/// A claimed navigation waiting for its fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTicket {
    request_id: u64,
    url: String,
    kind: NavigationKind,
    options: FetchOptions,
}

impl NavigationTicket {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> NavigationKind {
        self.kind
    }

    /// Fetches the page body. Blocks until the fetcher returns.
    pub fn run(self, fetcher: &dyn Fetcher) -> PageLoad {
        let result = fetcher
            .fetch(&self.url, &self.options)
            .map(|response| response.text());
        PageLoad {
            request_id: self.request_id,
            url: self.url,
            kind: self.kind,
            result,
        }
    }
}

/// Fetched page body (or the fetch error) for one ticket.
#[derive(Debug)]
pub struct PageLoad {
    request_id: u64,
    url: String,
    kind: NavigationKind,
    result: BrowserResult<String>,
}

impl PageLoad {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Result of an applied navigation, used for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Loaded { url: String, content_changed: bool },
    Failed { url: String, error: BrowserError },
}

impl NavigationOutcome {
    pub fn url(&self) -> &str {
        match self {
            Self::Loaded { url, .. } | Self::Failed { url, .. } => url,
        }
    }
}

/// Owns everything that changes when the user navigates.
#[derive(Debug)]
pub struct PageController<H> {
    page_options: FetchOptions,
    image_options: FetchOptions,
    parser: HtmlParser,
    history: NavigationHistory,
    textures: TextureCache<H>,
    current: Option<CurrentPage>,
    next_request_id: u64,
    inflight: Option<u64>,
}

impl<H> PageController<H> {
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            page_options: config.page_fetch_options(),
            image_options: config.image_fetch_options(),
            parser: HtmlParser,
            history: NavigationHistory::new(),
            textures: TextureCache::new(),
            current: None,
            next_request_id: 1,
            inflight: None,
        }
    }

    pub fn current(&self) -> Option<&CurrentPage> {
        self.current.as_ref()
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(CurrentPage::url)
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn textures(&self) -> &TextureCache<H> {
        &self.textures
    }

    pub fn image_options(&self) -> &FetchOptions {
        &self.image_options
    }

    pub fn is_loading(&self) -> bool {
        self.inflight.is_some()
    }

    pub fn can_go_back(&self) -> bool {
        self.history.can_go_back()
    }

    pub fn can_go_forward(&self) -> bool {
        self.history.can_go_forward()
    }

    /// Resolves `request` against the current page and claims a navigation.
    /// `None` when the request resolves to nothing.
    pub fn begin_navigation(&mut self, request: &str) -> Option<NavigationTicket> {
        let base = self.current_url().unwrap_or_default();
        let url = resolve(base, request.trim());
        if url.is_empty() {
            return None;
        }
        Some(self.issue(url, NavigationKind::Visit))
    }

    /// Steps the history cursor back and claims a fetch of that entry.
    pub fn begin_back(&mut self) -> Option<NavigationTicket> {
        let url = self.history.back()?.to_owned();
        Some(self.issue(url, NavigationKind::Back))
    }

    pub fn begin_forward(&mut self) -> Option<NavigationTicket> {
        let url = self.history.forward()?.to_owned();
        Some(self.issue(url, NavigationKind::Forward))
    }

    fn issue(&mut self, url: String, kind: NavigationKind) -> NavigationTicket {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.saturating_add(1);
        self.inflight = Some(request_id);
        log::debug!("navigation #{request_id} ({kind:?}) to {url}");

        NavigationTicket {
            request_id,
            url,
            kind,
            options: self.page_options.clone(),
        }
    }

    /// Forgets the in-flight navigation, e.g. when its worker died. Returns
    /// whether one was pending. A load for it that still arrives is stale.
    pub fn abandon_navigation(&mut self) -> bool {
        match self.inflight.take() {
            Some(request_id) => {
                log::warn!("abandoning navigation #{request_id}");
                true
            }
            None => false,
        }
    }

    /// Applies a finished fetch. Returns `None` for a stale load.
    ///
    /// A failed fetch still replaces the page (with an error message) and
    /// still counts as a visit. The document is re-parsed and the texture
    /// cache cleared only when the fetched text differs from what is shown.
    pub fn finish_navigation<U>(
        &mut self,
        load: PageLoad,
        uploader: &mut U,
    ) -> Option<NavigationOutcome>
    where
        U: TextureUploader<Handle = H>,
    {
        if self.inflight != Some(load.request_id) {
            log::debug!("dropping stale navigation #{} to {}", load.request_id, load.url);
            return None;
        }
        self.inflight = None;

        if load.kind == NavigationKind::Visit {
            self.history.record_visit(load.url.clone());
        }

        let (source, error) = match load.result {
            Ok(body) => (body, None),
            Err(error) => (format!("{FETCH_FAILED_PREFIX}: {error}"), Some(error)),
        };

        let previous = self.current.take();
        let content_changed = previous
            .as_ref()
            .is_none_or(|page| page.document.source() != source);

        let document = match previous {
            Some(page) if !content_changed => {
                // Images stay; claims from the previous load may belong to
                // workers that are gone.
                self.textures.release_pending();
                page.document
            }
            _ => {
                self.textures.clear(uploader);
                match error {
                    Some(_) => Document::error_page(source),
                    None => self.parser.parse(&source),
                }
            }
        };
        self.current = Some(CurrentPage {
            url: load.url.clone(),
            document,
        });

        let outcome = match error {
            None => {
                log::info!("navigated to {}", load.url);
                NavigationOutcome::Loaded {
                    url: load.url,
                    content_changed,
                }
            }
            Some(error) => {
                log::warn!("failed to fetch {}: {error}", load.url);
                NavigationOutcome::Failed {
                    url: load.url,
                    error,
                }
            }
        };
        Some(outcome)
    }

    /// Resolved URL of every `img` with a `src`, in tree order.
    pub fn image_urls(&self) -> Vec<String> {
        let Some(page) = &self.current else {
            return Vec::new();
        };

        page.document
            .descendants(Document::ROOT)
            .filter(|(_, node)| node.kind() == TagKind::Image)
            .filter_map(|(_, node)| node.attr("src"))
            .map(|src| resolve(&page.url, src))
            .filter(|url| !url.is_empty())
            .collect()
    }

    /// Claims every image of the current page that is not cached yet.
    pub fn image_jobs(&mut self) -> Vec<ImageJob> {
        self.image_urls()
            .iter()
            .filter_map(|url| self.textures.begin(url))
            .collect()
    }

    pub fn complete_image<U>(&mut self, result: ImageJobResult, uploader: &mut U) -> bool
    where
        U: TextureUploader<Handle = H>,
    {
        self.textures.complete(result, uploader)
    }

    /// Loads every image of the current page inline, one at a time.
    pub fn preload<U>(
        &mut self,
        fetcher: &dyn Fetcher,
        decoder: &dyn ImageDecoder,
        uploader: &mut U,
    ) where
        U: TextureUploader<Handle = H>,
    {
        for url in self.image_urls() {
            self.textures
                .ensure(&url, fetcher, &self.image_options, decoder, uploader);
        }
    }

    /// Address-bar or link navigation run to completion on this thread.
    pub fn navigate<U>(
        &mut self,
        request: &str,
        fetcher: &dyn Fetcher,
        decoder: &dyn ImageDecoder,
        uploader: &mut U,
    ) -> Option<NavigationOutcome>
    where
        U: TextureUploader<Handle = H>,
    {
        let ticket = self.begin_navigation(request)?;
        self.complete_inline(ticket, fetcher, decoder, uploader)
    }

    pub fn back<U>(
        &mut self,
        fetcher: &dyn Fetcher,
        decoder: &dyn ImageDecoder,
        uploader: &mut U,
    ) -> Option<NavigationOutcome>
    where
        U: TextureUploader<Handle = H>,
    {
        let ticket = self.begin_back()?;
        self.complete_inline(ticket, fetcher, decoder, uploader)
    }

    pub fn forward<U>(
        &mut self,
        fetcher: &dyn Fetcher,
        decoder: &dyn ImageDecoder,
        uploader: &mut U,
    ) -> Option<NavigationOutcome>
    where
        U: TextureUploader<Handle = H>,
    {
        let ticket = self.begin_forward()?;
        self.complete_inline(ticket, fetcher, decoder, uploader)
    }

    fn complete_inline<U>(
        &mut self,
        ticket: NavigationTicket,
        fetcher: &dyn Fetcher,
        decoder: &dyn ImageDecoder,
        uploader: &mut U,
    ) -> Option<NavigationOutcome>
    where
        U: TextureUploader<Handle = H>,
    {
        let outcome = self.finish_navigation(ticket.run(fetcher), uploader);
        self.preload(fetcher, decoder, uploader);
        outcome
    }

    /// Draws the current page. Nothing is drawn before the first navigation.
    pub fn render<S>(&self, surface: &mut S) -> RenderAction
    where
        S: DrawSurface<Texture = H>,
    {
        let Some(page) = &self.current else {
            return RenderAction::default();
        };
        let context = RenderContext {
            page_url: &page.url,
            images: &self.textures,
        };
        render_document(&page.document, &context, surface)
    }
}

#[cfg(test)]
mod tests {
    use super::NavigationOutcome;
    use super::PageController;
    use crate::config::BrowserConfig;
    use crate::testing::CountingUploader;
    use crate::testing::MapFetcher;
    use crate::testing::StubDecoder;
    use sk_render::DrawCall;
    use sk_render::RecordingSurface;

    const HOME: &str = "http://site/dir/index.html";

    struct Harness {
        controller: PageController<u32>,
        fetcher: MapFetcher,
        uploader: CountingUploader,
    }

    impl Harness {
        fn new(fetcher: MapFetcher) -> Self {
            Self {
                controller: PageController::new(&BrowserConfig::default()),
                fetcher,
                uploader: CountingUploader::default(),
            }
        }

        fn navigate(&mut self, request: &str) -> Option<NavigationOutcome> {
            self.controller
                .navigate(request, &self.fetcher, &StubDecoder, &mut self.uploader)
        }

        fn back(&mut self) -> Option<NavigationOutcome> {
            self.controller
                .back(&self.fetcher, &StubDecoder, &mut self.uploader)
        }

        fn forward(&mut self) -> Option<NavigationOutcome> {
            self.controller
                .forward(&self.fetcher, &StubDecoder, &mut self.uploader)
        }

        fn draw(&self) -> Vec<DrawCall<u32>> {
            let mut surface = RecordingSurface::new();
            self.controller.render(&mut surface);
            surface.into_calls()
        }
    }

    fn two_pages() -> MapFetcher {
        MapFetcher::new()
            .with_page(HOME, 200, b"<p>home</p>")
            .with_page("http://site/dir/b.html", 200, b"<p>b</p>")
    }

    #[test]
    fn relative_requests_resolve_against_current_page() {
        let mut harness = Harness::new(two_pages());
        harness.navigate(HOME);
        let outcome = harness.navigate("b.html");

        assert_eq!(
            outcome,
            Some(NavigationOutcome::Loaded {
                url: "http://site/dir/b.html".to_owned(),
                content_changed: true,
            })
        );
        assert_eq!(harness.fetcher.calls(), [HOME, "http://site/dir/b.html"]);
        assert_eq!(harness.controller.current_url(), Some("http://site/dir/b.html"));
    }

    #[test]
    fn back_and_forward_do_not_grow_history() {
        let mut harness = Harness::new(two_pages());
        harness.navigate(HOME);
        harness.navigate("b.html");

        assert!(harness.back().is_some());
        assert_eq!(harness.controller.current_url(), Some(HOME));
        assert_eq!(harness.controller.history().len(), 2);
        assert_eq!(harness.controller.history().position(), Some(0));
        assert!(!harness.controller.can_go_back());
        assert!(harness.back().is_none());

        assert!(harness.forward().is_some());
        assert_eq!(harness.controller.current_url(), Some("http://site/dir/b.html"));
        assert_eq!(harness.controller.history().len(), 2);
        assert_eq!(harness.draw(), harness.draw());
    }

    #[test]
    fn empty_request_does_nothing() {
        let mut harness = Harness::new(two_pages());
        assert!(harness.navigate("   ").is_none());
        assert!(harness.fetcher.calls().is_empty());
        assert!(harness.controller.history().is_empty());
        assert!(harness.draw().is_empty());
    }

    #[test]
    fn fetch_failure_shows_message_and_counts_as_visit() {
        let mut harness = Harness::new(MapFetcher::new());
        let outcome = harness.navigate("http://down.example/");

        assert!(matches!(outcome, Some(NavigationOutcome::Failed { .. })));
        assert_eq!(harness.controller.history().entries(), ["http://down.example/"]);
        assert_eq!(
            harness.draw(),
            [DrawCall::Text(
                "Failed to fetch URL: net.transport.connect_failed: no route to http://down.example/"
                    .to_owned()
            )]
        );
    }

    #[test]
    fn non_200_page_is_still_rendered() {
        let fetcher = MapFetcher::new().with_page(HOME, 404, b"<h2>Not here</h2>");
        let mut harness = Harness::new(fetcher);
        assert!(matches!(
            harness.navigate(HOME),
            Some(NavigationOutcome::Loaded { .. })
        ));
        assert!(harness.draw().contains(&DrawCall::Text("Not here".to_owned())));
    }

    #[test]
    fn preload_fills_cache_before_first_draw() {
        let fetcher = MapFetcher::new()
            .with_page(HOME, 200, b"<p><img src=\"img/a.png\"/><img src=\"x.svg\"/></p>")
            .with_page("http://site/dir/img/a.png", 200, b"abc");
        let mut harness = Harness::new(fetcher);
        harness.navigate(HOME);

        assert_eq!(harness.uploader.uploads, ["http://site/dir/img/a.png"]);
        assert_eq!(
            harness.draw(),
            [
                DrawCall::PushWrap,
                DrawCall::Image {
                    texture: 1,
                    width: 3,
                    height: 1
                },
                DrawCall::ColoredText("[Loading: x.svg]".to_owned(), sk_render::PLACEHOLDER_COLOR),
                DrawCall::PopWrap,
                DrawCall::NewLine,
            ]
        );
    }

    #[test]
    fn identical_content_keeps_document_and_textures() {
        let page = b"<img src=\"http://cdn/a.png\"/>";
        let fetcher = MapFetcher::new()
            .with_page(HOME, 200, page)
            .with_page("http://site/mirror.html", 200, page)
            .with_page("http://site/other.html", 200, b"<p>other</p>")
            .with_page("http://cdn/a.png", 200, b"ab");
        let mut harness = Harness::new(fetcher);

        harness.navigate(HOME);
        let first = harness.draw();
        let outcome = harness.navigate("http://site/mirror.html");

        assert_eq!(
            outcome,
            Some(NavigationOutcome::Loaded {
                url: "http://site/mirror.html".to_owned(),
                content_changed: false,
            })
        );
        assert_eq!(harness.draw(), first);
        assert!(harness.uploader.released.is_empty());
        assert_eq!(harness.uploader.uploads.len(), 1);

        harness.navigate("http://site/other.html");
        assert_eq!(harness.uploader.released, [1]);
        assert!(harness.controller.textures().is_empty());
    }

    #[test]
    fn reload_with_same_content_reclaims_abandoned_images() {
        let fetcher = MapFetcher::new()
            .with_page(HOME, 200, b"<img src=\"a.png\"/>")
            .with_page("http://site/dir/a.png", 200, b"ab");
        let mut harness = Harness::new(fetcher);

        let Some(ticket) = harness.controller.begin_navigation(HOME) else {
            panic!("home should resolve");
        };
        let load = ticket.run(&harness.fetcher);
        harness.controller.finish_navigation(load, &mut harness.uploader);
        let abandoned = harness.controller.image_jobs();
        assert_eq!(abandoned.len(), 1);
        drop(abandoned);

        let Some(ticket) = harness.controller.begin_navigation(HOME) else {
            panic!("home should resolve");
        };
        let load = ticket.run(&harness.fetcher);
        let outcome = harness.controller.finish_navigation(load, &mut harness.uploader);
        assert!(matches!(
            outcome,
            Some(NavigationOutcome::Loaded {
                content_changed: false,
                ..
            })
        ));

        let jobs = harness.controller.image_jobs();
        assert_eq!(jobs.len(), 1);
        let options = harness.controller.image_options().clone();
        for job in jobs {
            let result = job.run(&harness.fetcher, &options, &StubDecoder);
            assert!(
                harness
                    .controller
                    .complete_image(result, &mut harness.uploader)
            );
        }
        assert!(harness.controller.textures().contains("http://site/dir/a.png"));
    }

    #[test]
    fn abandoned_navigation_stops_loading() {
        let mut harness = Harness::new(two_pages());
        harness.navigate(HOME);
        let Some(ticket) = harness.controller.begin_navigation("b.html") else {
            panic!("b.html should resolve");
        };
        assert!(harness.controller.is_loading());

        assert!(harness.controller.abandon_navigation());
        assert!(!harness.controller.is_loading());
        assert!(!harness.controller.abandon_navigation());

        let late = ticket.run(&harness.fetcher);
        assert!(
            harness
                .controller
                .finish_navigation(late, &mut harness.uploader)
                .is_none()
        );
        assert_eq!(harness.controller.current_url(), Some(HOME));
        assert_eq!(harness.controller.history().len(), 1);
    }

    #[test]
    fn stale_navigation_is_dropped() {
        let mut harness = Harness::new(two_pages());
        let first = harness.controller.begin_navigation(HOME);
        let second = harness.controller.begin_navigation("http://site/dir/b.html");
        let (Some(first), Some(second)) = (first, second) else {
            panic!("both requests should resolve");
        };
        assert!(harness.controller.is_loading());

        let late = first.run(&harness.fetcher);
        let latest = second.run(&harness.fetcher);
        assert!(
            harness
                .controller
                .finish_navigation(late, &mut harness.uploader)
                .is_none()
        );
        assert!(harness.controller.is_loading());
        assert!(
            harness
                .controller
                .finish_navigation(latest, &mut harness.uploader)
                .is_some()
        );

        assert!(!harness.controller.is_loading());
        assert_eq!(harness.controller.current_url(), Some("http://site/dir/b.html"));
        assert_eq!(harness.controller.history().entries(), ["http://site/dir/b.html"]);
    }

    #[test]
    fn image_job_from_previous_page_is_discarded() {
        let fetcher = MapFetcher::new()
            .with_page(HOME, 200, b"<img src=\"a.png\"/>")
            .with_page("http://site/dir/b.html", 200, b"<img src=\"a.png\"/><p>b</p>")
            .with_page("http://site/dir/a.png", 200, b"a");
        let mut harness = Harness::new(fetcher);

        let Some(ticket) = harness.controller.begin_navigation(HOME) else {
            panic!("home should resolve");
        };
        let load = ticket.run(&harness.fetcher);
        harness.controller.finish_navigation(load, &mut harness.uploader);
        let jobs = harness.controller.image_jobs();
        assert_eq!(jobs.len(), 1);
        assert!(harness.controller.image_jobs().is_empty());

        harness.navigate("b.html");
        let options = harness.controller.image_options().clone();
        for job in jobs {
            let result = job.run(&harness.fetcher, &options, &StubDecoder);
            assert!(
                !harness
                    .controller
                    .complete_image(result, &mut harness.uploader)
            );
        }
        // Only the preload of the new page uploaded anything.
        assert_eq!(harness.uploader.uploads, ["http://site/dir/a.png"]);
        assert_eq!(harness.controller.textures().len(), 1);
    }

    #[test]
    fn clicked_link_yields_resolved_target() {
        let fetcher =
            MapFetcher::new().with_page(HOME, 200, b"<p><a href=\"../up.html\">up</a></p>");
        let mut harness = Harness::new(fetcher);
        harness.navigate(HOME);

        let mut surface = RecordingSurface::clicking("up");
        let action = harness.controller.render(&mut surface);
        assert_eq!(action.navigate_to.as_deref(), Some("http://site/dir/../up.html"));
        assert!(surface.is_balanced());
    }

    #[test]
    fn rerunning_pipeline_on_same_content_draws_the_same() {
        let fetcher = MapFetcher::new().with_page(
            HOME,
            200,
            b"<h1>T</h1><p>a <b>b</b> <a href=\"/c\">c</a><img src=\"d.png\"/></p>",
        );
        let mut first = Harness::new(fetcher);
        first.navigate(HOME);
        let calls = first.draw();
        first.navigate(HOME);
        assert_eq!(first.draw(), calls);
        assert_eq!(first.controller.history().len(), 2);
    }
}
