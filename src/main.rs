#![warn(clippy::all, rust_2018_idioms)]

use std::sync::Arc;

use geodraw::GeoDrawApp;
use geodraw::config::ServiceConfig;
use geodraw::service::HttpTransformService;

fn main() -> eframe::Result {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let config = ServiceConfig::from_env();
    if config.api_key.is_none() {
        log::warn!("GEOFLIP_API_KEY is not set; requests are sent without an API key");
    }
    log::info!("Using transform service at {}", config.base_url);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([640.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "geodraw",
        native_options,
        Box::new(move |cc| {
            let service = HttpTransformService::new(config)?;
            Ok(Box::new(GeoDrawApp::new(cc, Arc::new(service))))
        }),
    )
}
