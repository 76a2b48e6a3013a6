//! Core business logic abstractions

pub mod chart;
pub mod config;
pub mod converter;
pub mod history;
pub mod indicator;
pub mod log;
pub mod unit;

// Re-export main types for cleaner imports
pub use chart::{ChartController, ChartSurface, LineChartSpec};
pub use converter::{ConvertError, Converter, ConverterView};
pub use history::HistoryRenderer;
pub use indicator::{IndicatorProvider, IndicatorSeries, IndicatorSnapshot};
pub use unit::UnitCode;
