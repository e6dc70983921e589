use crate::config::CSV_FILE_NAME;
use crate::data::{Bar, PriceSeries};
use crate::error::ExportError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// One CSV line: the date index followed by the flat columns.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "Volume")]
    volume: u64,
}

impl From<&Bar> for CsvRow {
    fn from(bar: &Bar) -> Self {
        Self {
            date: bar.date,
            close: bar.close,
            high: bar.high,
            low: bar.low,
            open: bar.open,
            volume: bar.volume.max(0.0).round() as u64,
        }
    }
}

impl From<CsvRow> for Bar {
    fn from(row: CsvRow) -> Self {
        Self {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume as f64,
        }
    }
}

/// Serializes the whole series, index included.
pub fn to_csv(series: &PriceSeries) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if series.is_empty() {
        writer.write_record(["Date", "Close", "High", "Low", "Open", "Volume"])?;
    }
    for bar in &series.bars {
        writer.serialize(CsvRow::from(bar))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidRow {
        row: 0,
        reason: e.to_string(),
    })
}

/// Parses a file produced by [`to_csv`].
#[cfg(test)]
pub fn from_csv<R: std::io::Read>(symbol: &str, reader: R) -> Result<PriceSeries, ExportError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut bars = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|e| ExportError::InvalidRow {
            row: i + 1,
            reason: e.to_string(),
        })?;
        bars.push(Bar::from(row));
    }
    Ok(PriceSeries::new(symbol, bars))
}

/// Writes `stock_data.csv` into `dir` and returns its path.
pub fn write_csv_file(series: &PriceSeries, dir: &Path) -> Result<PathBuf, ExportError> {
    let path = dir.join(CSV_FILE_NAME);
    std::fs::write(&path, to_csv(series)?)?;
    info!("Wrote {} rows for {} to {}", series.len(), series.symbol, path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::series_with_closes;

    #[test]
    fn test_csv_header_and_index() {
        let series = series_with_closes("AAPL", &[185.64, 184.25]);
        let csv = to_csv(&series).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Date,Close,High,Low,Open,Volume"));
        assert_eq!(lines.next(), Some("2024-01-01,185.64,186.64,184.64,185.14,1000"));
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_csv_round_trip_preserves_closes() {
        let closes: Vec<f64> = (0..40).map(|i| 170.0 + (i as f64) * 0.37 - (i % 3) as f64).collect();
        let series = series_with_closes("AAPL", &closes);

        let csv = to_csv(&series).unwrap();
        let parsed = from_csv("AAPL", csv.as_bytes()).unwrap();

        assert_eq!(parsed.len(), series.len());
        for (a, b) in parsed.closes().iter().zip(series.closes()) {
            assert!((a - b).abs() < 1e-9);
        }
        assert_eq!(parsed.bars[0].date, series.bars[0].date);
    }

    #[test]
    fn test_empty_series_exports_header_only() {
        let csv = to_csv(&PriceSeries::empty("NOPE")).unwrap();
        assert_eq!(csv.trim_end(), "Date,Close,High,Low,Open,Volume");
        assert!(from_csv("NOPE", csv.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_from_csv_reports_bad_row() {
        let body = "Date,Close,High,Low,Open,Volume\n2024-01-01,abc,1,1,1,1\n";
        let err = from_csv("AAPL", body.as_bytes()).unwrap_err();
        assert!(matches!(err, ExportError::InvalidRow { row: 1, .. }));
    }

    #[test]
    fn test_write_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let series = series_with_closes("AAPL", &[1.0, 2.0, 3.0]);
        let path = write_csv_file(&series, dir.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), "stock_data.csv");
        let file = std::fs::File::open(&path).unwrap();
        assert_eq!(from_csv("AAPL", file).unwrap().closes(), vec![1.0, 2.0, 3.0]);
    }
}
