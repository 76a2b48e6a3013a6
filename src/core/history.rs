//! Renders the recent history of a unit as a line chart.

use super::chart::{ChartController, LineChartSpec, ReplaceOutcome, SERIES_COLOR};
use super::indicator::{IndicatorProvider, IndicatorSeries};
use super::unit::UnitCode;
use anyhow::{Result, bail};
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Number of points taken from the head of a series.
pub const HISTORY_POINTS: usize = 10;

const DATE_LABEL_LEN: usize = 10;

/// Calendar-date prefix of an API timestamp, e.g. `2024-05-10T04:00:00.000Z`.
pub fn date_label(date: &str) -> String {
    date.chars().take(DATE_LABEL_LEN).collect()
}

/// The head of a series split into parallel label and value sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl HistoryWindow {
    pub fn from_series(series: &IndicatorSeries) -> Self {
        let head = series.points.iter().take(HISTORY_POINTS);
        let (labels, values): (Vec<String>, Vec<f64>) = head.map(|p| (date_label(&p.date), p.value)).unzip();
        Self { labels, values }
    }

    pub fn into_chart_spec(self, unit: UnitCode) -> LineChartSpec {
        LineChartSpec {
            labels: self.labels,
            values: self.values,
            dataset_label: format!("Historial de {}", unit.as_str().to_uppercase()),
            color: SERIES_COLOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Drawn(LineChartSpec),
    Superseded,
}

pub struct HistoryRenderer {
    provider: Arc<dyn IndicatorProvider>,
    charts: ChartController,
}

impl HistoryRenderer {
    pub fn new(provider: Arc<dyn IndicatorProvider>, charts: ChartController) -> Self {
        Self { provider, charts }
    }

    pub fn charts(&self) -> &ChartController {
        &self.charts
    }

    /// Fetches the history of `unit` and replaces the current chart with it.
    ///
    /// Failures are logged only; whatever chart was on screen stays there.
    pub async fn render(&self, unit: UnitCode) {
        if let Err(e) = self.try_render(unit).await {
            error!(error = %e, unit = %unit, "Failed to render indicator history");
        }
    }

    #[instrument(name = "HistoryRender", skip(self), fields(unit = %unit))]
    pub async fn try_render(&self, unit: UnitCode) -> Result<RenderOutcome> {
        let token = self.charts.begin()?;
        let series = self.provider.fetch_series(unit).await?;
        debug!(points = series.points.len(), "Received indicator series");

        let window = HistoryWindow::from_series(&series);
        if window.values.is_empty() {
            bail!("No history data found for unit: {}", unit);
        }

        let spec = window.into_chart_spec(unit);
        match self.charts.replace(token, spec.clone())? {
            ReplaceOutcome::Drawn => Ok(RenderOutcome::Drawn(spec)),
            ReplaceOutcome::Superseded => Ok(RenderOutcome::Superseded),
        }
    }
}
