//! Ownership of the single live history chart

use anyhow::{Result, anyhow};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Line colour of the history series.
pub const SERIES_COLOR: (u8, u8, u8) = (75, 192, 192);

/// Everything a surface needs to draw one history chart. The series is drawn
/// as a plain line with no area fill below it.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChartSpec {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub dataset_label: String,
    pub color: (u8, u8, u8),
}

/// A drawn chart that can be torn down.
pub trait ChartResource: Send + Sync {
    fn release(&mut self) -> Result<()>;
}

/// A fully rendered chart that has not been put on display yet.
pub trait PreparedChart: Send {
    fn commit(self: Box<Self>) -> Result<Box<dyn ChartResource>>;
}

/// Where charts get drawn.
pub trait ChartSurface: Send + Sync {
    /// Does all of the drawing work without touching what is on display.
    fn prepare(&self, spec: &LineChartSpec) -> Result<Box<dyn PreparedChart>>;
}

pub struct ChartHandle {
    spec: LineChartSpec,
    resource: Box<dyn ChartResource>,
}

impl ChartHandle {
    pub fn spec(&self) -> &LineChartSpec {
        &self.spec
    }
}

/// Identifies one render attempt. Only the most recently issued token may
/// replace the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderToken(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum ReplaceOutcome {
    Drawn,
    Superseded,
}

#[derive(Default)]
struct ControllerState {
    generation: u64,
    current: Option<ChartHandle>,
}

pub struct ChartController {
    surface: Box<dyn ChartSurface>,
    state: Mutex<ControllerState>,
}

impl ChartController {
    pub fn new(surface: Box<dyn ChartSurface>) -> Self {
        Self {
            surface,
            state: Mutex::new(ControllerState::default()),
        }
    }

    /// Starts a render attempt, superseding any attempt still in flight.
    pub fn begin(&self) -> Result<RenderToken> {
        let mut state = self.lock()?;
        state.generation += 1;
        debug!(generation = state.generation, "Chart render started");
        Ok(RenderToken(state.generation))
    }

    /// Releases the current chart, if any, and puts `spec` in its place.
    ///
    /// Tokens from superseded attempts leave the current chart untouched, and
    /// so does a failure to render or to release the current chart.
    pub fn replace(&self, token: RenderToken, spec: LineChartSpec) -> Result<ReplaceOutcome> {
        let mut state = self.lock()?;
        if token.0 != state.generation {
            debug!(
                token = token.0,
                generation = state.generation,
                "Discarding superseded chart render"
            );
            return Ok(ReplaceOutcome::Superseded);
        }

        let prepared = self.surface.prepare(&spec)?;

        if let Some(mut previous) = state.current.take() {
            debug!(dataset = %previous.spec.dataset_label, "Releasing previous chart");
            if let Err(e) = previous.resource.release() {
                state.current = Some(previous);
                return Err(e);
            }
        }

        let resource = prepared.commit().inspect_err(|e| {
            warn!(error = %e, "Chart rendered but could not be displayed");
        })?;
        debug!(dataset = %spec.dataset_label, points = spec.values.len(), "Chart drawn");
        state.current = Some(ChartHandle { spec, resource });
        Ok(ReplaceOutcome::Drawn)
    }

    pub fn current(&self) -> Option<LineChartSpec> {
        self.lock()
            .ok()
            .and_then(|state| state.current.as_ref().map(|h| h.spec().clone()))
    }

    pub fn live_charts(&self) -> usize {
        self.lock()
            .map(|state| usize::from(state.current.is_some()))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ControllerState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("Chart controller state is poisoned"))
    }
}
