use crate::config::{self, DATE_FORMAT, ForecastSettings};
use crate::data::{PriceSeries, flatten_columns};
use crate::error::{DashboardError, InputError};
use crate::forecast::{Forecast, forecast_next_close};
use crate::provider::MarketDataProvider;
use chrono::NaiveDate;
use tracing::{info, warn};

/// Validated `(symbol, start, end)` triple. Construct with [`DashboardRequest::new`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DashboardRequest {
    pub fn new(symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Self, InputError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(InputError::EmptySymbol);
        }
        if end < start {
            return Err(InputError::InvertedRange { start, end });
        }
        Ok(Self { symbol, start, end })
    }

    /// Builds a request from raw text inputs (`YYYY-MM-DD` dates).
    pub fn parse(symbol: &str, start: &str, end: &str) -> Result<Self, InputError> {
        let start = parse_date("start", start)?;
        let end = parse_date("end", end)?;
        Self::new(symbol, start, end)
    }

    pub fn default_for_today() -> Self {
        Self {
            symbol: config::DEFAULT_SYMBOL.to_string(),
            start: config::default_start_date(),
            end: config::default_end_date(),
        }
    }
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| InputError::BadDate {
        field,
        value: value.to_string(),
    })
}

/// What a fetch produced. `Empty` is a normal outcome, not an error.
#[derive(Clone, Debug, PartialEq)]
pub enum SeriesOutcome {
    Data(PriceSeries),
    Empty,
}

impl SeriesOutcome {
    pub fn from_series(series: PriceSeries) -> Self {
        if series.is_empty() {
            Self::Empty
        } else {
            Self::Data(series)
        }
    }

    pub fn series(&self) -> Option<&PriceSeries> {
        match self {
            Self::Data(series) => Some(series),
            Self::Empty => None,
        }
    }
}

/// Everything one render pass needs.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardReport {
    pub request: DashboardRequest,
    pub outcome: SeriesOutcome,
    pub forecast: Option<Forecast>,
}

/// Fetch, normalize and forecast for one request.
///
/// One provider call per invocation; nothing is cached between calls, so a
/// retry is simply a second invocation with the same request.
pub async fn run_dashboard(
    provider: &dyn MarketDataProvider,
    request: &DashboardRequest,
    settings: &ForecastSettings,
) -> Result<DashboardReport, DashboardError> {
    let frame = provider
        .fetch_daily(&request.symbol, request.start, request.end)
        .await
        .map_err(|source| DashboardError::Provider {
            provider: provider.name(),
            symbol: request.symbol.clone(),
            source,
        })?;

    let series = PriceSeries::from_frame(&request.symbol, &flatten_columns(frame)).map_err(
        |source| DashboardError::Provider {
            provider: provider.name(),
            symbol: request.symbol.clone(),
            source,
        },
    )?;

    let outcome = SeriesOutcome::from_series(series);
    let forecast = match &outcome {
        SeriesOutcome::Data(series) => {
            info!(
                "Fetched {} bars for {} ({}..{})",
                series.len(),
                request.symbol,
                request.start,
                request.end
            );
            forecast_next_close(series, settings)
        }
        SeriesOutcome::Empty => {
            warn!(
                "No data for {} between {} and {}",
                request.symbol, request.start, request.end
            );
            None
        }
    };

    Ok(DashboardReport {
        request: request.clone(),
        outcome,
        forecast,
    })
}
