//! SVG file surface for history charts, drawn with plotters.

use crate::core::chart::{ChartResource, ChartSurface, LineChartSpec, PreparedChart};
use anyhow::{Context, Result, anyhow, bail};
use plotters::prelude::*;
use std::path::PathBuf;
use tracing::debug;

pub struct SvgSurface {
    path: PathBuf,
    width: u32,
    height: u32,
}

impl SvgSurface {
    pub fn new<P: Into<PathBuf>>(path: P, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
        }
    }
}

/// A rendered SVG document waiting to be written out.
pub struct PreparedSvg {
    path: PathBuf,
    document: String,
}

impl PreparedChart for PreparedSvg {
    fn commit(self: Box<Self>) -> Result<Box<dyn ChartResource>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(&self.path, &self.document)
            .with_context(|| format!("Failed to write chart: {}", self.path.display()))?;
        debug!(path = %self.path.display(), "Wrote chart");

        Ok(Box::new(SvgChart { path: self.path }))
    }
}

/// A chart written to disk. Releasing it removes the file.
pub struct SvgChart {
    path: PathBuf,
}

impl ChartResource for SvgChart {
    fn release(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove chart: {}", self.path.display())),
        }
    }
}

impl ChartSurface for SvgSurface {
    fn prepare(&self, spec: &LineChartSpec) -> Result<Box<dyn PreparedChart>> {
        if spec.values.is_empty() {
            bail!("Cannot draw a chart without data points");
        }
        let document = draw_line_chart((self.width, self.height), spec)?;

        Ok(Box::new(PreparedSvg {
            path: self.path.clone(),
            document,
        }))
    }
}

fn draw_line_chart(size: (u32, u32), spec: &LineChartSpec) -> Result<String> {
    let mut document = String::new();
    {
        let root = SVGBackend::with_string(&mut document, size).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| anyhow!("Failed to fill canvas: {}", e))?;

        let min = spec.values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = spec.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let padding = (max - min).max(max.abs() * 0.01).max(1e-8) * 0.1;
        let last_index = spec.values.len() - 1;

        let (r, g, b) = spec.color;
        let color = RGBColor(r, g, b);

        let mut chart = ChartBuilder::on(&root)
            .caption(&spec.dataset_label, ("sans-serif", 24).into_font())
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(0..last_index.max(1), (min - padding)..(max + padding))
            .map_err(|e| anyhow!("Failed to build chart: {}", e))?;

        chart
            .configure_mesh()
            .x_labels(spec.labels.len())
            .x_label_formatter(&|idx: &usize| spec.labels.get(*idx).cloned().unwrap_or_default())
            .y_label_formatter(&|v: &f64| format!("{v:.2}"))
            .draw()
            .map_err(|e| anyhow!("Failed to draw mesh: {}", e))?;

        chart
            .draw_series(LineSeries::new(
                spec.values.iter().copied().enumerate(),
                color.stroke_width(2),
            ))
            .map_err(|e| anyhow!("Failed to draw series: {}", e))?
            .label(&spec.dataset_label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(|e| anyhow!("Failed to draw legend: {}", e))?;

        root.present()
            .map_err(|e| anyhow!("Failed to render chart: {}", e))?;
    }
    Ok(document)
}
