use chrono::NaiveDate;
use thiserror::Error;

/// Rejections raised before any network call is made.
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("stock symbol is required")]
    EmptySymbol,

    #[error("end date {end} is before start date {start}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid {field} date '{value}', expected YYYY-MM-DD")]
    BadDate { field: &'static str, value: String },
}

/// Failures surfaced by a market-data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response for {symbol}: {reason}")]
    Malformed { symbol: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("{provider} fetch failed for {symbol}: {source}")]
    Provider {
        provider: &'static str,
        symbol: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Export(#[from] ExportError),
}
