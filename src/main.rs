mod annotator;
mod app;
mod config;
mod legend;
mod model;
mod upload;

use anyhow::{anyhow, Result};
use clap::Parser;
use eframe::egui;

use crate::annotator::Annotator;
use crate::app::PlotApp;
use crate::config::{CliArgs, WidgetConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let mut config = WidgetConfig::load(args.config.as_deref())?;
    config.apply_cli(&args);

    let registry = config.registry()?;
    if registry.is_empty() {
        log::warn!("no categories configured; markers cannot be placed until one is added");
    }
    let annotator = Annotator::new(registry, config.allow_color_override);
    let mut app = PlotApp::new(annotator, config);
    if let Some(path) = &args.image {
        app.open_path(path);
    }

    let title = match &args.image {
        Some(path) => format!(
            "marker-plot — {}",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("")
        ),
        None => "marker-plot".to_string(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(&title)
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(&title, options, Box::new(move |_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow!("failed to run eframe: {e}"))
}
