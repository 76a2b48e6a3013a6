//! Converts an amount into a reference unit and triggers the history chart.

use super::history::HistoryRenderer;
use super::indicator::{IndicatorProvider, IndicatorSnapshot};
use super::unit::UnitCode;
use rust_decimal::prelude::*;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const VALIDATION_MESSAGE: &str = "El monto debe ser un número mayor a cero \"0\".";
pub const FETCH_ERROR_MESSAGE: &str = "Error al obtener los datos. Intente nuevamente.";

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Invalid amount: {0:?}")]
    InvalidAmount(String),
    #[error("Unsupported unit: {0}")]
    UnsupportedUnit(String),
    #[error("Failed to fetch current indicators: {0:#}")]
    Fetch(anyhow::Error),
    #[error("No current value found for unit: {0}")]
    MissingUnit(UnitCode),
    #[error("Invalid rate {rate} for unit: {unit}")]
    InvalidRate { unit: UnitCode, rate: f64 },
}

impl ConvertError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            ConvertError::InvalidAmount(_) => VALIDATION_MESSAGE,
            _ => FETCH_ERROR_MESSAGE,
        }
    }
}

/// Parses a user supplied amount. Anything that is not a number above zero is
/// rejected.
pub fn parse_amount(raw: &str) -> Result<Decimal, ConvertError> {
    let trimmed = raw.trim();
    let plain_number = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !plain_number {
        return Err(ConvertError::InvalidAmount(raw.to_string()));
    }
    let amount = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ConvertError::InvalidAmount(raw.to_string()))?;
    if amount <= Decimal::ZERO {
        return Err(ConvertError::InvalidAmount(raw.to_string()));
    }
    Ok(amount)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionRequest {
    pub amount: Decimal,
    pub unit: UnitCode,
}

impl ConversionRequest {
    /// Validates the amount first, then the unit. Performs no I/O.
    pub fn parse(raw_amount: &str, raw_unit: &str) -> Result<Self, ConvertError> {
        let amount = parse_amount(raw_amount)?;
        let unit = raw_unit
            .parse::<UnitCode>()
            .map_err(|_| ConvertError::UnsupportedUnit(raw_unit.to_string()))?;
        Ok(Self { amount, unit })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub request: ConversionRequest,
    pub rate: f64,
    pub converted: Decimal,
}

impl Conversion {
    pub fn result_text(&self) -> String {
        format!(
            "Resultado: {:.2} {}",
            self.converted,
            self.request.unit.label()
        )
    }
}

/// Divides the amount by the unit's current value, rounded to two decimals.
pub fn compute(
    request: ConversionRequest,
    snapshot: &IndicatorSnapshot,
) -> Result<Conversion, ConvertError> {
    let indicator = snapshot
        .get(request.unit)
        .ok_or(ConvertError::MissingUnit(request.unit))?;
    let invalid_rate = || ConvertError::InvalidRate {
        unit: request.unit,
        rate: indicator.value,
    };

    let rate = Decimal::from_f64(indicator.value).ok_or_else(invalid_rate)?;
    if rate <= Decimal::ZERO {
        return Err(invalid_rate());
    }
    // Only overflows here, the rate is known to be positive
    let converted = request
        .amount
        .checked_div(rate)
        .ok_or_else(|| ConvertError::InvalidAmount(request.amount.to_string()))?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Ok(Conversion {
        request,
        rate: indicator.value,
        converted,
    })
}

/// What the user currently sees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConverterView {
    pub result_text: String,
    pub history_visible: bool,
}

pub struct Converter {
    provider: Arc<dyn IndicatorProvider>,
    renderer: HistoryRenderer,
    view: Mutex<ConverterView>,
}

impl Converter {
    pub fn new(provider: Arc<dyn IndicatorProvider>, renderer: HistoryRenderer) -> Self {
        Self {
            provider,
            renderer,
            view: Mutex::new(ConverterView::default()),
        }
    }

    pub fn renderer(&self) -> &HistoryRenderer {
        &self.renderer
    }

    pub fn view(&self) -> anyhow::Result<ConverterView> {
        self.lock_view().map(|view| view.clone())
    }

    pub async fn fetch_rates(&self) -> Result<IndicatorSnapshot, ConvertError> {
        self.provider
            .fetch_snapshot()
            .await
            .map_err(ConvertError::Fetch)
    }

    /// Handles one convert action end to end and updates the view.
    ///
    /// On failure the view shows the matching user message; the chart and its
    /// visibility are only touched after a successful conversion.
    #[instrument(name = "Convert", skip(self))]
    pub async fn on_convert(
        &self,
        raw_amount: &str,
        raw_unit: &str,
    ) -> Result<Conversion, ConvertError> {
        let result = self.convert(raw_amount, raw_unit).await;
        match &result {
            Ok(conversion) => {
                info!(converted = %conversion.converted, rate = conversion.rate, "Conversion done");
                self.update_view(|view| view.result_text = conversion.result_text());

                self.renderer.render(conversion.request.unit).await;
                self.update_view(|view| view.history_visible = true);
            }
            Err(e) => {
                warn!(error = %e, "Conversion failed");
                self.update_view(|view| view.result_text = e.user_message().to_string());
            }
        }
        result
    }

    async fn convert(&self, raw_amount: &str, raw_unit: &str) -> Result<Conversion, ConvertError> {
        let request = ConversionRequest::parse(raw_amount, raw_unit)?;
        let snapshot = self.fetch_rates().await?;
        debug!(indicators = snapshot.len(), "Received indicator snapshot");
        compute(request, &snapshot)
    }

    fn update_view(&self, update: impl FnOnce(&mut ConverterView)) {
        match self.lock_view() {
            Ok(mut view) => update(&mut view),
            Err(e) => warn!(error = %e, "Dropping view update"),
        }
    }

    fn lock_view(&self) -> anyhow::Result<MutexGuard<'_, ConverterView>> {
        self.view
            .lock()
            .map_err(|_| anyhow::anyhow!("Converter view is poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chart::ChartController;
    use crate::core::chart::testing::CountingSurface;
    use crate::core::indicator::IndicatorValue;
    use crate::providers::mindicador::MindicadorProvider;
    use std::sync::atomic::Ordering;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SNAPSHOT_JSON: &str = r#"{
        "version": "1.7.0",
        "autor": "mindicador.cl",
        "fecha": "2024-05-10T20:00:00.000Z",
        "uf": {"codigo": "uf", "nombre": "Unidad de fomento (UF)", "unidad_medida": "Pesos", "fecha": "2024-05-10T04:00:00.000Z", "valor": 37245.67},
        "dolar": {"codigo": "dolar", "nombre": "Dólar observado", "unidad_medida": "Pesos", "fecha": "2024-05-10T04:00:00.000Z", "valor": 900},
        "euro": {"codigo": "euro", "nombre": "Euro", "unidad_medida": "Pesos", "fecha": "2024-05-10T04:00:00.000Z", "valor": 1000}
    }"#;

    fn series_json(first_value: f64) -> String {
        let points: Vec<String> = (0..12)
            .map(|i| {
                format!(
                    r#"{{"fecha": "2024-05-{:02}T04:00:00.000Z", "valor": {}}}"#,
                    i + 1,
                    first_value + i as f64
                )
            })
            .collect();
        format!(r#"{{"serie": [{}]}}"#, points.join(","))
    }

    async fn mock_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SNAPSHOT_JSON))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dolar"))
            .respond_with(ResponseTemplate::new(200).set_body_string(series_json(900.0)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/euro"))
            .respond_with(ResponseTemplate::new(200).set_body_string(series_json(1000.0)))
            .mount(&server)
            .await;
        server
    }

    fn converter(base_url: &str, surface: &CountingSurface) -> Converter {
        let provider: Arc<dyn IndicatorProvider> = Arc::new(MindicadorProvider::new(base_url));
        let renderer = HistoryRenderer::new(
            Arc::clone(&provider),
            ChartController::new(Box::new(surface.clone())),
        );
        Converter::new(provider, renderer)
    }

    fn snapshot(code: &str, value: f64) -> IndicatorSnapshot {
        IndicatorSnapshot::new([IndicatorValue {
            code: code.to_string(),
            name: None,
            value,
            as_of: None,
        }])
    }

    #[test]
    fn test_parse_amount_fails_closed() {
        for raw in [
            "0", "-5", "", "   ", "abc", "12abc", "NaN", "-0.0", "1__", "1_000", "1,000", "0x10",
        ] {
            assert!(
                matches!(parse_amount(raw), Err(ConvertError::InvalidAmount(_))),
                "{raw:?} should be rejected"
            );
        }
        assert_eq!(parse_amount("1000").unwrap(), Decimal::from(1000));
        assert_eq!(parse_amount(" 12.5 ").unwrap(), Decimal::new(125, 1));
        assert_eq!(parse_amount("1e3").unwrap(), Decimal::from(1000));
    }

    #[test]
    fn test_request_validates_amount_before_unit() {
        let err = ConversionRequest::parse("0", "yen").unwrap_err();
        assert!(matches!(err, ConvertError::InvalidAmount(_)));

        let err = ConversionRequest::parse("10", "yen").unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedUnit(ref u) if u == "yen"));
        assert_eq!(err.user_message(), FETCH_ERROR_MESSAGE);
    }

    #[test]
    fn test_compute_rounds_to_two_decimals() {
        let request = ConversionRequest::parse("1000", "dolar").unwrap();
        let conversion = compute(request, &snapshot("dolar", 900.0)).unwrap();
        assert_eq!(conversion.converted, Decimal::new(111, 2));
        assert_eq!(conversion.result_text(), "Resultado: 1.11 $ (USD)");

        let request = ConversionRequest::parse("1", "euro").unwrap();
        let conversion = compute(request, &snapshot("euro", 8.0)).unwrap();
        assert_eq!(conversion.result_text(), "Resultado: 0.13 € (EUR)");

        let request = ConversionRequest::parse("74491.34", "uf").unwrap();
        let conversion = compute(request, &snapshot("uf", 37245.67)).unwrap();
        assert_eq!(conversion.result_text(), "Resultado: 2.00 UF");
    }

    #[test]
    fn test_compute_missing_unit_is_lookup_error() {
        let request = ConversionRequest::parse("1000", "euro").unwrap();
        let err = compute(request, &snapshot("dolar", 900.0)).unwrap_err();
        assert!(matches!(err, ConvertError::MissingUnit(UnitCode::Euro)));
        assert_eq!(err.to_string(), "No current value found for unit: euro");
    }

    #[test]
    fn test_compute_overflow_is_an_amount_error() {
        let request = ConversionRequest::parse("79228162514264337593543950335", "dolar").unwrap();
        let err = compute(request, &snapshot("dolar", 0.5)).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidAmount(_)));
        assert_eq!(err.user_message(), VALIDATION_MESSAGE);
    }

    #[test]
    fn test_poisoned_view_is_reported() {
        let surface = CountingSurface::default();
        let converter = converter("http://127.0.0.1:9", &surface);

        let poisoned = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = converter.view.lock().unwrap();
                panic!("poison the view");
            })
            .join()
        });
        assert!(poisoned.is_err());

        let err = converter.view().unwrap_err();
        assert_eq!(err.to_string(), "Converter view is poisoned");
    }

    #[test]
    fn test_compute_rejects_zero_rate() {
        let request = ConversionRequest::parse("1000", "dolar").unwrap();
        let err = compute(request, &snapshot("dolar", 0.0)).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidRate { .. }));
    }

    #[tokio::test]
    async fn test_invalid_amount_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SNAPSHOT_JSON))
            .expect(0)
            .mount(&server)
            .await;
        let surface = CountingSurface::default();
        let converter = converter(&server.uri(), &surface);

        for raw in ["0", "-1", "abc"] {
            let result = converter.on_convert(raw, "dolar").await;
            assert!(matches!(result, Err(ConvertError::InvalidAmount(_))));
            assert_eq!(converter.view().unwrap().result_text, VALIDATION_MESSAGE);
            assert!(!converter.view().unwrap().history_visible);
        }
    }

    #[tokio::test]
    async fn test_successful_conversion_renders_history() {
        let server = mock_server().await;
        let surface = CountingSurface::default();
        let converter = converter(&server.uri(), &surface);

        let conversion = converter.on_convert("1000", "dolar").await.unwrap();

        assert_eq!(conversion.rate, 900.0);
        let view = converter.view().unwrap();
        assert_eq!(view.result_text, "Resultado: 1.11 $ (USD)");
        assert!(view.history_visible);
        let chart = converter.renderer().charts().current().unwrap();
        assert_eq!(chart.dataset_label, "Historial de DOLAR");
        assert_eq!(chart.values.len(), 10);
    }

    #[tokio::test]
    async fn test_second_conversion_replaces_chart() {
        let server = mock_server().await;
        let surface = CountingSurface::default();
        let converter = converter(&server.uri(), &surface);

        converter.on_convert("1000", "dolar").await.unwrap();
        converter.on_convert("1000", "euro").await.unwrap();

        assert_eq!(converter.view().unwrap().result_text, "Resultado: 1.00 € (EUR)");
        assert_eq!(surface.live.load(Ordering::SeqCst), 1);
        assert_eq!(surface.peak.load(Ordering::SeqCst), 1);
        let chart = converter.renderer().charts().current().unwrap();
        assert_eq!(chart.dataset_label, "Historial de EURO");
        assert_eq!(chart.values[0], 1000.0);
    }

    #[tokio::test]
    async fn test_fetch_failure_shows_generic_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let surface = CountingSurface::default();
        let converter = converter(&server.uri(), &surface);

        let result = converter.on_convert("1000", "dolar").await;

        assert!(matches!(result, Err(ConvertError::Fetch(_))));
        let view = converter.view().unwrap();
        assert_eq!(view.result_text, FETCH_ERROR_MESSAGE);
        assert!(!view.history_visible);
        assert_eq!(surface.drawn.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unreachable_server_shows_generic_error() {
        let surface = CountingSurface::default();
        let converter = converter("http://127.0.0.1:9", &surface);

        let result = converter.on_convert("1000", "uf").await;

        assert!(matches!(result, Err(ConvertError::Fetch(_))));
        assert_eq!(converter.view().unwrap().result_text, FETCH_ERROR_MESSAGE);
        assert!(!converter.view().unwrap().history_visible);
    }

    #[tokio::test]
    async fn test_missing_unit_in_snapshot_shows_generic_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"dolar": {"valor": 900}}"#),
            )
            .mount(&server)
            .await;
        let surface = CountingSurface::default();
        let converter = converter(&server.uri(), &surface);

        let result = converter.on_convert("1000", "uf").await;

        assert!(matches!(result, Err(ConvertError::MissingUnit(UnitCode::Uf))));
        assert_eq!(converter.view().unwrap().result_text, FETCH_ERROR_MESSAGE);
        assert!(!converter.view().unwrap().history_visible);
    }

    #[tokio::test]
    async fn test_history_failure_still_reveals_container() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SNAPSHOT_JSON))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/uf"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        let surface = CountingSurface::default();
        let converter = converter(&server.uri(), &surface);

        converter.on_convert("74491.34", "uf").await.unwrap();

        let view = converter.view().unwrap();
        assert_eq!(view.result_text, "Resultado: 2.00 UF");
        assert!(view.history_visible);
        assert!(converter.renderer().charts().current().is_none());
    }
}
