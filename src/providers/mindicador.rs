use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::core::indicator::{
    IndicatorProvider, IndicatorSeries, IndicatorSnapshot, IndicatorValue, SeriesPoint,
};
use crate::core::unit::UnitCode;

pub const DEFAULT_BASE_URL: &str = "https://mindicador.cl/api";

/// Client for the mindicador.cl daily indicators API.
pub struct MindicadorProvider {
    base_url: String,
}

impl MindicadorProvider {
    pub fn new(base_url: &str) -> Self {
        MindicadorProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_text(&self, url: &str, what: &str) -> Result<String> {
        debug!("Requesting {} from {}", what, url);

        let client = reqwest::Client::builder()
            .user_agent("conversor/0.1")
            .build()?;
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for {} URL: {}", e, what, url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for {}", response.status(), what));
        }

        Ok(response.text().await?)
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotEntry {
    valor: f64,
    nombre: Option<String>,
    fecha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    serie: Vec<SeriesEntry>,
}

#[derive(Debug, Deserialize)]
struct SeriesEntry {
    fecha: String,
    valor: f64,
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Keeps every top level entry that looks like an indicator. Metadata such as
/// `version` or `autor` is skipped.
fn parse_snapshot(text: &str) -> Result<IndicatorSnapshot> {
    let data: serde_json::Map<String, Value> = serde_json::from_str(text)
        .map_err(|e| anyhow!("Failed to parse JSON response for indicators: {}", e))?;

    let values = data.into_iter().filter_map(|(code, value)| {
        if !value.is_object() {
            return None;
        }
        match serde_json::from_value::<SnapshotEntry>(value) {
            Ok(entry) => Some(IndicatorValue {
                code,
                name: entry.nombre,
                value: entry.valor,
                as_of: entry.fecha.as_deref().and_then(parse_timestamp),
            }),
            Err(e) => {
                warn!(code = %code, error = %e, "Skipping malformed indicator");
                None
            }
        }
    });

    Ok(IndicatorSnapshot::new(values))
}

#[async_trait]
impl IndicatorProvider for MindicadorProvider {
    #[instrument(name = "SnapshotFetch", skip(self))]
    async fn fetch_snapshot(&self) -> Result<IndicatorSnapshot> {
        let text = self.get_text(&self.base_url, "current indicators").await?;
        parse_snapshot(&text)
    }

    #[instrument(name = "SeriesFetch", skip(self), fields(unit = %unit))]
    async fn fetch_series(&self, unit: UnitCode) -> Result<IndicatorSeries> {
        let url = format!("{}/{}", self.base_url, unit.as_str());
        let text = self.get_text(&url, unit.as_str()).await?;

        let data: SeriesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", unit, e))?;

        Ok(IndicatorSeries {
            unit,
            points: data
                .serie
                .into_iter()
                .map(|entry| SeriesPoint {
                    date: entry.fecha,
                    value: entry.valor,
                })
                .collect(),
        })
    }
}
