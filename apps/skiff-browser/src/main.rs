mod app;
mod decode;
mod surface;
mod upload;

use eframe::egui;
use sk_browser::BrowserConfig;
use sk_browser::CONFIG_FILE_NAME;
use sk_net::Fetcher;
use sk_net::HttpFetcher;
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<(), eframe::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BrowserConfig::load(Path::new(CONFIG_FILE_NAME)).unwrap_or_else(|error| {
        log::warn!("{error}; using default configuration");
        BrowserConfig::default()
    });

    let fetcher: Arc<dyn Fetcher> = match HttpFetcher::new() {
        Ok(fetcher) => Arc::new(fetcher),
        Err(error) => {
            log::error!("Skiff startup error: {error}");
            return Ok(());
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Skiff")
            .with_inner_size([config.window_width as f32, config.window_height as f32])
            .with_min_inner_size([480.0, 320.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Skiff",
        native_options,
        Box::new(move |cc| {
            let app = app::SkiffApp::new(cc.egui_ctx.clone(), &config, fetcher);
            Ok(Box::new(app))
        }),
    )
}
