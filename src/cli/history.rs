use super::{convert::display_history, ui};
use crate::core::history::RenderOutcome;
use crate::core::{HistoryRenderer, UnitCode};
use anyhow::Result;
use std::path::Path;

pub async fn run(renderer: &HistoryRenderer, chart_path: &Path, unit: &str) -> Result<()> {
    let unit: UnitCode = unit.parse()?;

    let spinner = ui::new_spinner("Consultando historial...");
    let outcome = renderer.try_render(unit).await;
    spinner.finish_and_clear();

    if let RenderOutcome::Superseded = outcome? {
        anyhow::bail!("History render for {} was superseded", unit);
    }
    display_history(renderer.charts(), chart_path);
    Ok(())
}
