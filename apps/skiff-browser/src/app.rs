use crate::decode::RasterDecoder;
use crate::surface::EguiSurface;
use crate::upload::EguiUploader;
use eframe::egui;
use sk_browser::BrowserConfig;
use sk_browser::ImageJob;
use sk_browser::ImageJobResult;
use sk_browser::NavigationOutcome;
use sk_browser::NavigationTicket;
use sk_browser::PageController;
use sk_browser::PageLoad;
use sk_net::FetchOptions;
use sk_net::Fetcher;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const LOADING_REPAINT_INTERVAL: Duration = Duration::from_millis(50);
const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(200, 65, 65);

pub struct SkiffApp {
    controller: PageController<egui::TextureHandle>,
    fetcher: Arc<dyn Fetcher>,
    decoder: Arc<RasterDecoder>,
    uploader: EguiUploader,
    address_input: String,
    status_line: String,
    last_error: Option<String>,
    nav_receiver: Option<mpsc::Receiver<PageLoad>>,
    image_receiver: Option<mpsc::Receiver<ImageJobResult>>,
    ctx: egui::Context,
}

impl SkiffApp {
    pub fn new(ctx: egui::Context, config: &BrowserConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let mut app = Self {
            controller: PageController::new(config),
            fetcher,
            decoder: Arc::new(RasterDecoder),
            uploader: EguiUploader::new(ctx.clone()),
            address_input: config.home_url.clone(),
            status_line: "Ready".to_owned(),
            last_error: None,
            nav_receiver: None,
            image_receiver: None,
            ctx,
        };
        app.navigate(&config.home_url);
        app
    }

    fn navigate(&mut self, request: &str) {
        let ticket = self.controller.begin_navigation(request);
        self.start(ticket);
    }

    fn navigate_back(&mut self) {
        let ticket = self.controller.begin_back();
        self.start(ticket);
    }

    fn navigate_forward(&mut self) {
        let ticket = self.controller.begin_forward();
        self.start(ticket);
    }

    fn start(&mut self, ticket: Option<NavigationTicket>) {
        let Some(ticket) = ticket else {
            return;
        };
        self.address_input = ticket.url().to_owned();
        self.status_line = format!("Loading {}...", ticket.url());
        self.last_error = None;

        let (tx, rx) = mpsc::channel();
        self.nav_receiver = Some(rx);

        let fetcher = Arc::clone(&self.fetcher);
        let ctx = self.ctx.clone();
        let nav_job = move || {
            let load = ticket.run(fetcher.as_ref());
            let _ = tx.send(load);
            ctx.request_repaint();
        };

        if let Err(error) = thread::Builder::new()
            .name("skiff-nav".to_owned())
            .spawn(nav_job)
        {
            log::error!("failed to spawn navigation worker: {error}");
            self.nav_receiver = None;
            self.status_line = "Navigation failed".to_owned();
            self.last_error = Some("failed to spawn navigation worker".to_owned());
        }
    }

    fn poll_navigation(&mut self) {
        let message = match &self.nav_receiver {
            Some(receiver) => receiver.try_recv(),
            None => return,
        };
        let load = match message {
            Ok(load) => load,
            Err(mpsc::TryRecvError::Empty) => return,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.nav_receiver = None;
                self.controller.abandon_navigation();
                self.status_line = "Navigation failed".to_owned();
                self.last_error = Some("navigation worker stopped unexpectedly".to_owned());
                return;
            }
        };
        self.nav_receiver = None;

        let Some(outcome) = self.controller.finish_navigation(load, &mut self.uploader) else {
            return;
        };

        self.address_input = outcome.url().to_owned();
        match &outcome {
            NavigationOutcome::Loaded { url, .. } => {
                self.status_line = format!("Loaded {url}");
                self.last_error = None;
            }
            NavigationOutcome::Failed { url, error } => {
                self.status_line = format!("Failed to load {url}");
                self.last_error = Some(error.to_string());
            }
        }

        let jobs = self.controller.image_jobs();
        self.start_images(jobs);
    }

    /// Runs `jobs` one after another on a single worker. Replacing the
    /// receiver makes the previous worker stop at its next send.
    fn start_images(&mut self, jobs: Vec<ImageJob>) {
        if jobs.is_empty() {
            self.image_receiver = None;
            return;
        }

        let (tx, rx) = mpsc::channel();
        self.image_receiver = Some(rx);

        let fetcher = Arc::clone(&self.fetcher);
        let decoder = Arc::clone(&self.decoder);
        let options: FetchOptions = self.controller.image_options().clone();
        let ctx = self.ctx.clone();
        let image_job = move || {
            for job in jobs {
                let result = job.run(fetcher.as_ref(), &options, decoder.as_ref());
                if tx.send(result).is_err() {
                    log::debug!("image worker superseded by a newer page");
                    break;
                }
                ctx.request_repaint();
            }
        };

        if let Err(error) = thread::Builder::new()
            .name("skiff-images".to_owned())
            .spawn(image_job)
        {
            log::error!("failed to spawn image worker: {error}");
            self.image_receiver = None;
        }
    }

    fn poll_images(&mut self) {
        loop {
            let message = match &self.image_receiver {
                Some(receiver) => receiver.try_recv(),
                None => return,
            };
            match message {
                Ok(result) => {
                    self.controller.complete_image(result, &mut self.uploader);
                }
                Err(mpsc::TryRecvError::Empty) => return,
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.image_receiver = None;
                    return;
                }
            }
        }
    }

    fn is_busy(&self) -> bool {
        self.controller.is_loading() || self.image_receiver.is_some()
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.controller.can_go_back(), egui::Button::new("<"))
                .clicked()
            {
                self.navigate_back();
            }
            if ui
                .add_enabled(self.controller.can_go_forward(), egui::Button::new(">"))
                .clicked()
            {
                self.navigate_forward();
            }

            let width = (ui.available_width() - 60.0).max(200.0);
            let response = ui.add_sized(
                [width, 24.0],
                egui::TextEdit::singleline(&mut self.address_input).hint_text("Enter URL"),
            );
            let pressed_enter =
                response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));
            if pressed_enter || ui.button("Go").clicked() {
                let request = self.address_input.clone();
                self.navigate(&request);
            }
        });
    }

    fn viewport(&mut self, ui: &mut egui::Ui) {
        let mut navigate_to = None;
        egui::ScrollArea::both()
            .id_salt("viewport_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    let mut surface = EguiSurface::new(ui);
                    navigate_to = self.controller.render(&mut surface).navigate_to;
                });
            });

        if let Some(url) = navigate_to {
            self.navigate(&url);
        }
    }
}

impl eframe::App for SkiffApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_navigation();
        self.poll_images();
        if self.is_busy() {
            ctx.request_repaint_after(LOADING_REPAINT_INTERVAL);
        }

        egui::TopBottomPanel::top("toolbar_panel").show(ctx, |ui| self.toolbar(ui));

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                if self.controller.is_loading() {
                    ui.spinner();
                }
                ui.label(&self.status_line);
                if let Some(error) = &self.last_error {
                    ui.colored_label(ERROR_COLOR, format!("Error: {error}"));
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| self.viewport(ui));
    }
}
