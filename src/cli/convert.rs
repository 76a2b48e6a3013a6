use super::ui;
use crate::core::{ChartController, Converter};
use anyhow::Result;
use std::path::Path;

pub async fn run(converter: &Converter, chart_path: &Path, amount: &str, unit: &str) -> Result<()> {
    let spinner = ui::new_spinner("Consultando indicadores...");
    let result = converter.on_convert(amount, unit).await;
    spinner.finish_and_clear();

    let view = converter.view()?;
    if let Err(e) = result {
        println!("{}", ui::style_text(&view.result_text, ui::StyleType::Error));
        return Err(e.into());
    }

    println!("{}", ui::style_text(&view.result_text, ui::StyleType::Result));
    if view.history_visible {
        display_history(converter.renderer().charts(), chart_path);
    }
    Ok(())
}

/// Prints the chart currently on display, if any.
pub fn display_history(charts: &ChartController, chart_path: &Path) {
    match charts.current() {
        Some(spec) => {
            println!(
                "\n{}",
                ui::style_text(&spec.dataset_label, ui::StyleType::Title)
            );
            println!("{}", ui::history_table(&spec));
            println!(
                "{}",
                ui::style_text(
                    &format!("Gráfico guardado en {}", chart_path.display()),
                    ui::StyleType::Subtle
                )
            );
        }
        None => println!(
            "{}",
            ui::style_text("Historial no disponible.", ui::StyleType::Subtle)
        ),
    }
}
