//! Indicator abstractions and core types

use super::unit::UnitCode;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Current value of a single indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorValue {
    pub code: String,
    pub name: Option<String>,
    pub value: f64,
    pub as_of: Option<DateTime<Utc>>,
}

/// All current indicators, keyed by code. Fetched fresh for every conversion.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSnapshot {
    values: HashMap<String, IndicatorValue>,
}

impl IndicatorSnapshot {
    pub fn new(values: impl IntoIterator<Item = IndicatorValue>) -> Self {
        Self {
            values: values.into_iter().map(|v| (v.code.clone(), v)).collect(),
        }
    }

    pub fn get(&self, unit: UnitCode) -> Option<&IndicatorValue> {
        self.values.get(unit.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub date: String,
    pub value: f64,
}

/// Time series for one unit, in the order the source delivered it.
#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub unit: UnitCode,
    pub points: Vec<SeriesPoint>,
}

#[async_trait]
pub trait IndicatorProvider: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<IndicatorSnapshot>;
    async fn fetch_series(&self, unit: UnitCode) -> Result<IndicatorSeries>;
}
