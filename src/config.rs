use chrono::NaiveDate;
use std::sync::OnceLock;
use tracing::{info, warn};

static DATA_PROVIDER_MODE: OnceLock<DataProviderMode> = OnceLock::new();

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataProviderMode {
    Yahoo,
    Mock,
}

impl DataProviderMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
            Self::Mock => "mock",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yahoo" | "yfinance" => Some(Self::Yahoo),
            "mock" | "offline" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// Provider picked by `STOCK_DASHBOARD_DATA_PROVIDER`, resolved once per process.
pub fn configured_data_provider_mode() -> DataProviderMode {
    *DATA_PROVIDER_MODE.get_or_init(|| {
        let raw = std::env::var("STOCK_DASHBOARD_DATA_PROVIDER")
            .unwrap_or_else(|_| "yahoo".to_string());

        match DataProviderMode::parse(&raw) {
            Some(mode) => {
                info!("Data provider: {}", mode.as_str());
                mode
            }
            None => {
                warn!(
                    "Unknown STOCK_DASHBOARD_DATA_PROVIDER={} ; defaulting to yahoo. Allowed values: yahoo | mock",
                    raw.trim()
                );
                DataProviderMode::Yahoo
            }
        }
    })
}

/// Knobs for the next-day trend forecast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForecastSettings {
    /// The forecast runs only when the series has strictly more rows than this.
    pub min_rows: usize,
    /// Fixed half-width of the displayed band around the prediction.
    pub margin: f64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            min_rows: FORECAST_MIN_ROWS,
            margin: PREDICTION_MARGIN,
        }
    }
}

impl ForecastSettings {
    pub fn with_overrides(min_rows: Option<usize>, margin: Option<f64>) -> Self {
        let defaults = Self::default();
        Self {
            min_rows: min_rows.unwrap_or(defaults.min_rows),
            margin: margin.unwrap_or(defaults.margin),
        }
    }
}

pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub fn default_end_date() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub const DEFAULT_SYMBOL: &str = "AAPL";
pub const FORECAST_MIN_ROWS: usize = 30;
pub const PREDICTION_MARGIN: f64 = 1.25;
/// Rows shown in the tail table.
pub const TAIL_ROWS: usize = 5;
pub const CSV_FILE_NAME: &str = "stock_data.csv";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const WEBUI_PORT: u16 = 8080;
pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
pub const HTTP_TIMEOUT_SECS: u64 = 20;
/// Seed for the offline random-walk provider so repeated fetches match.
pub const MOCK_SEED: u64 = 42;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_settings_defaults_and_overrides() {
        let defaults = ForecastSettings::default();
        assert_eq!(defaults.min_rows, 30);
        assert_eq!(defaults.margin, 1.25);

        let custom = ForecastSettings::with_overrides(Some(10), None);
        assert_eq!(custom.min_rows, 10);
        assert_eq!(custom.margin, 1.25);
    }

    #[test]
    fn test_provider_mode_parse() {
        assert_eq!(DataProviderMode::parse(" Yahoo "), Some(DataProviderMode::Yahoo));
        assert_eq!(DataProviderMode::parse("yfinance"), Some(DataProviderMode::Yahoo));
        assert_eq!(DataProviderMode::parse("MOCK"), Some(DataProviderMode::Mock));
        assert_eq!(DataProviderMode::parse("polygon"), None);
    }

    #[test]
    fn test_default_start_date() {
        assert_eq!(default_start_date().to_string(), "2023-01-01");
    }
}
