use crate::config::{self, DataProviderMode};
use crate::data::{COLUMNS, ColumnLabel, RawFrame};
use crate::error::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Weekday};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A source of daily bars.
///
/// Implementations issue exactly one request per call. An unknown symbol or a
/// range without trading days comes back as an empty frame, not an error.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Daily bars for `symbol` from `start` (inclusive) to `end` (exclusive).
    async fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawFrame, ProviderError>;
}

pub fn provider_for(mode: DataProviderMode) -> Result<Arc<dyn MarketDataProvider>, ProviderError> {
    Ok(match mode {
        DataProviderMode::Yahoo => Arc::new(YahooProvider::new()?),
        DataProviderMode::Mock => Arc::new(MockProvider::default()),
    })
}

// ──────────────────────────────────────────────────────────────────────────────
// Yahoo Finance
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Deserialize, Debug)]
struct YahooChart {
    #[serde(default)]
    result: Option<Vec<YahooResult>>,
    #[serde(default)]
    error: Option<YahooError>,
}

#[derive(Deserialize, Debug)]
struct YahooError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct YahooResult {
    #[serde(default)]
    meta: YahooMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Deserialize, Debug, Default)]
struct YahooMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Deserialize, Debug)]
struct YahooIndicators {
    #[serde(default)]
    quote: Vec<YahooQuote>,
}

#[derive(Deserialize, Debug, Default)]
struct YahooQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: reqwest::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(config::YAHOO_CHART_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0")
            .timeout(std::time::Duration::from_secs(config::HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawFrame, ProviderError> {
        if end <= start {
            debug!("Empty range {}..{} for {}, skipping request", start, end, symbol);
            return Ok(RawFrame::empty());
        }

        let url = format!("{}/{}", self.base_url, symbol);
        let params = [
            ("period1", day_start_epoch(start).to_string()),
            ("period2", day_start_epoch(end).to_string()),
            ("interval", "1d".to_string()),
            ("events", "history".to_string()),
        ];

        info!("Fetching {} daily bars {}..{} from Yahoo", symbol, start, end);
        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed: YahooChartResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed {
                symbol: symbol.to_string(),
                reason: format!("HTTP {}: {}", status, e),
            })?;

        chart_to_frame(symbol, parsed)
    }
}

fn day_start_epoch(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

fn chart_to_frame(symbol: &str, response: YahooChartResponse) -> Result<RawFrame, ProviderError> {
    if let Some(err) = response.chart.error {
        warn!(
            "Yahoo returned no data for {}: {} ({})",
            symbol,
            err.code,
            err.description.unwrap_or_default()
        );
        return Ok(RawFrame::empty());
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(RawFrame::empty());
    };
    if result.timestamp.is_empty() {
        return Ok(RawFrame::empty());
    }

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let mut index = Vec::with_capacity(result.timestamp.len());
    let mut rows = Vec::with_capacity(result.timestamp.len());
    for (i, &timestamp) in result.timestamp.iter().enumerate() {
        let local = DateTime::from_timestamp(timestamp + result.meta.gmtoffset, 0).ok_or_else(|| {
            ProviderError::Malformed {
                symbol: symbol.to_string(),
                reason: format!("timestamp {} out of range", timestamp),
            }
        })?;
        index.push(local.date_naive());
        rows.push(vec![
            value_at(&quote.close, i),
            value_at(&quote.high, i),
            value_at(&quote.low, i),
            value_at(&quote.open, i),
            value_at(&quote.volume, i),
        ]);
    }

    let ticker = symbol.to_uppercase();
    Ok(RawFrame {
        columns: COLUMNS
            .iter()
            .map(|field| ColumnLabel::compound(&[*field, ticker.as_str()]))
            .collect(),
        index,
        rows,
    })
}

fn value_at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

// ──────────────────────────────────────────────────────────────────────────────
// Offline random walk
// ──────────────────────────────────────────────────────────────────────────────

/// Deterministic synthetic bars on weekdays, for running without network access.
pub struct MockProvider {
    seed: u64,
    start_price: f64,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            seed: config::MOCK_SEED,
            start_price: 100.0,
        }
    }
}

impl MockProvider {
    fn rng_for(&self, symbol: &str) -> StdRng {
        let salt = symbol
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        StdRng::seed_from_u64(self.seed ^ salt)
    }

    pub fn generate(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> RawFrame {
        let mut rng = self.rng_for(symbol);
        let mut index = Vec::new();
        let mut rows = Vec::new();
        let mut current_price = self.start_price;

        for date in start.iter_days().take_while(|d| *d < end) {
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }
            let volatility = 0.02;
            let change_pct: f64 = rng.gen_range(-volatility..volatility);
            let open = current_price;
            let close = open * (1.0 + change_pct);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume: f64 = rng.gen_range(1_000_000.0..5_000_000.0);

            index.push(date);
            rows.push(vec![
                Some(close),
                Some(high),
                Some(low),
                Some(open),
                Some(volume.round()),
            ]);
            current_price = close;
        }

        RawFrame {
            columns: COLUMNS
                .iter()
                .map(|c| ColumnLabel::Flat(c.to_string()))
                .collect(),
            index,
            rows,
        }
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawFrame, ProviderError> {
        Ok(self.generate(symbol, start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{PriceSeries, flatten_columns};

    const CHART_OK: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "AAPL", "gmtoffset": -18000 },
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open":   [187.15, 184.22, null],
                        "high":   [188.44, 185.88, 183.09],
                        "low":    [183.89, 183.43, 180.88],
                        "close":  [185.64, 184.25, 181.91],
                        "volume": [82488700, 58414500, 71983600]
                    }],
                    "adjclose": [{ "adjclose": [184.94, 183.56, 181.22] }]
                }
            }],
            "error": null
        }
    }"#;

    const CHART_NOT_FOUND: &str = r#"{
        "chart": {
            "result": null,
            "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
        }
    }"#;

    fn parse(body: &str) -> YahooChartResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_chart_to_frame_labels_and_dates() {
        let frame = chart_to_frame("aapl", parse(CHART_OK)).unwrap();
        assert_eq!(frame.rows.len(), 3);
        assert_eq!(frame.columns[0], ColumnLabel::compound(&["Close", "AAPL"]));
        assert_eq!(frame.index[0].to_string(), "2024-01-02");
        assert_eq!(frame.index[2].to_string(), "2024-01-04");
        assert_eq!(frame.rows[0][0], Some(185.64));
        assert_eq!(frame.rows[2][3], None);
    }

    #[test]
    fn test_chart_to_series_after_flatten() {
        let frame = chart_to_frame("AAPL", parse(CHART_OK)).unwrap();
        let series = PriceSeries::from_frame("AAPL", &flatten_columns(frame)).unwrap();
        // Third bar has a null open.
        assert_eq!(series.closes(), vec![185.64, 184.25]);
    }

    #[test]
    fn test_chart_error_yields_empty_frame() {
        let frame = chart_to_frame("ZZZZZZ", parse(CHART_NOT_FOUND)).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn test_day_start_epoch() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        assert_eq!(day_start_epoch(date), 1_672_531_200);
    }

    #[tokio::test]
    async fn test_yahoo_skips_request_for_empty_range() {
        let provider = YahooProvider::with_base_url("http://127.0.0.1:9").unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let frame = provider.fetch_daily("AAPL", day, day).await.unwrap();
        assert!(frame.is_empty());
    }

    #[tokio::test]
    async fn test_mock_provider_weekdays_and_determinism() {
        let provider = MockProvider::default();
        // 2024-01-01 is a Monday; two full weeks.
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let a = provider.fetch_daily("AAPL", start, end).await.unwrap();
        let b = provider.fetch_daily("AAPL", start, end).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.rows.len(), 10);
        assert!(a.index.iter().all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(a.index.iter().all(|d| *d >= start && *d < end));

        let series = PriceSeries::from_frame("AAPL", &a).unwrap();
        assert!(series.bars.iter().all(|b| b.low <= b.close && b.close <= b.high));
    }
}
