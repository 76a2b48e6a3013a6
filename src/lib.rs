pub mod cli;
pub mod core;
pub mod providers;
pub mod render;

use crate::core::config::AppConfig;
use crate::core::{ChartController, Converter, HistoryRenderer, IndicatorProvider};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Convert { amount: String, unit: String },
    History { unit: String },
}

/// Wires the provider, chart surface and converter described by `config`.
pub fn build_converter(config: &AppConfig) -> Result<(Converter, PathBuf)> {
    let chart_path = config.chart_path()?;
    let provider: Arc<dyn IndicatorProvider> =
        Arc::new(providers::MindicadorProvider::new(config.base_url()));
    let surface = render::SvgSurface::new(&chart_path, config.chart.width, config.chart.height);
    let renderer = HistoryRenderer::new(
        Arc::clone(&provider),
        ChartController::new(Box::new(surface)),
    );
    Ok((Converter::new(provider, renderer), chart_path))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Conversor starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let (converter, chart_path) = build_converter(&config)?;
    match command {
        AppCommand::Convert { amount, unit } => {
            cli::convert::run(&converter, &chart_path, &amount, &unit).await
        }
        AppCommand::History { unit } => {
            cli::history::run(converter.renderer(), &chart_path, &unit).await
        }
    }
}
