use crate::error::ProviderError;
use chrono::NaiveDate;

/// Flat column names of a normalized series, in the order the provider emits them.
pub const COLUMNS: [&str; 5] = ["Close", "High", "Low", "Open", "Volume"];

/// A single daily OHLCV bar.
#[derive(Clone, Debug, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Values in [`COLUMNS`] order.
    pub fn values(&self) -> [f64; 5] {
        [self.close, self.high, self.low, self.open, self.volume]
    }
}

/// Daily history for one symbol. Dates are strictly increasing.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
}

/// Column label as handed back by a provider. Multi-ticker clients label
/// columns with a `(field, symbol)` pair instead of a plain name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnLabel {
    Flat(String),
    Compound(Vec<String>),
}

impl ColumnLabel {
    pub fn compound(parts: &[&str]) -> Self {
        Self::Compound(parts.iter().map(|p| p.to_string()).collect())
    }

    /// The addressable name: the label itself, or the first part of a compound label.
    pub fn primary(&self) -> &str {
        match self {
            Self::Flat(name) => name,
            Self::Compound(parts) => parts.first().map(String::as_str).unwrap_or(""),
        }
    }
}

/// Provider output before normalization: one date per row, one value per column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawFrame {
    pub columns: Vec<ColumnLabel>,
    pub index: Vec<NaiveDate>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl RawFrame {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Collapses every compound label to its primary component so columns can
/// be addressed by plain name.
pub fn flatten_columns(mut frame: RawFrame) -> RawFrame {
    frame.columns = frame
        .columns
        .into_iter()
        .map(|label| match label {
            ColumnLabel::Compound(parts) => {
                ColumnLabel::Flat(parts.into_iter().next().unwrap_or_default())
            }
            flat => flat,
        })
        .collect();
    frame
}

impl PriceSeries {
    pub fn new(symbol: &str, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self {
            symbol: symbol.to_string(),
            bars,
        }
    }

    pub fn empty(symbol: &str) -> Self {
        Self::new(symbol, Vec::new())
    }

    /// Builds a series from a frame whose columns are already flat.
    ///
    /// Rows with any missing OHLCV value are dropped. A frame without rows
    /// yields an empty series regardless of its columns.
    pub fn from_frame(symbol: &str, frame: &RawFrame) -> Result<Self, ProviderError> {
        if frame.is_empty() {
            return Ok(Self::empty(symbol));
        }

        if frame.index.len() != frame.rows.len() {
            return Err(ProviderError::Malformed {
                symbol: symbol.to_string(),
                reason: format!(
                    "{} index entries for {} rows",
                    frame.index.len(),
                    frame.rows.len()
                ),
            });
        }

        let position = |name: &str| {
            frame
                .columns
                .iter()
                .position(|c| c.primary() == name)
                .ok_or_else(|| ProviderError::Malformed {
                    symbol: symbol.to_string(),
                    reason: format!("missing column '{}'", name),
                })
        };
        let open = position("Open")?;
        let high = position("High")?;
        let low = position("Low")?;
        let close = position("Close")?;
        let volume = position("Volume")?;

        let value = |row: &[Option<f64>], col: usize| row.get(col).copied().flatten();

        let bars = frame
            .index
            .iter()
            .zip(&frame.rows)
            .filter_map(|(&date, row)| {
                let row = row.as_slice();
                Some(Bar {
                    date,
                    open: value(row, open)?,
                    high: value(row, high)?,
                    low: value(row, low)?,
                    close: value(row, close)?,
                    volume: value(row, volume)?,
                })
            })
            .collect();

        Ok(Self::new(symbol, bars))
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// `(rows, columns)`, not counting the date index.
    pub fn shape(&self) -> (usize, usize) {
        if self.is_empty() {
            (0, 0)
        } else {
            (self.bars.len(), COLUMNS.len())
        }
    }

    pub fn tail(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn date(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    pub(crate) fn series_with_closes(symbol: &str, closes: &[f64]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: date(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000.0 + i as f64,
            })
            .collect();
        PriceSeries::new(symbol, bars)
    }

    fn compound_frame() -> RawFrame {
        RawFrame {
            columns: COLUMNS
                .iter()
                .map(|c| ColumnLabel::compound(&[*c, "AAPL"]))
                .collect(),
            index: vec![date(0), date(1), date(2)],
            rows: vec![
                vec![Some(10.0), Some(11.0), Some(9.0), Some(9.5), Some(100.0)],
                vec![Some(10.5), None, Some(9.5), Some(10.0), Some(120.0)],
                vec![Some(11.0), Some(11.5), Some(10.0), Some(10.5), Some(130.0)],
            ],
        }
    }

    #[test]
    fn test_flatten_compound_columns() {
        let flat = flatten_columns(compound_frame());
        let names: Vec<&str> = flat.columns.iter().map(|c| c.primary()).collect();
        assert_eq!(names, COLUMNS.to_vec());
        assert!(flat.columns.iter().all(|c| matches!(c, ColumnLabel::Flat(_))));
    }

    #[test]
    fn test_flatten_keeps_flat_labels() {
        let frame = RawFrame {
            columns: vec![
                ColumnLabel::Flat("Close".to_string()),
                ColumnLabel::compound(&["Open", "MSFT"]),
            ],
            ..RawFrame::empty()
        };
        let flat = flatten_columns(frame);
        assert_eq!(
            flat.columns,
            vec![
                ColumnLabel::Flat("Close".to_string()),
                ColumnLabel::Flat("Open".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_frame_drops_incomplete_rows() {
        let series = PriceSeries::from_frame("AAPL", &flatten_columns(compound_frame())).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![10.0, 11.0]);
        assert_eq!(series.bars[1].open, 10.5);
        assert_eq!(series.bars[1].volume, 130.0);
    }

    #[test]
    fn test_from_frame_empty_is_not_an_error() {
        let series = PriceSeries::from_frame("NOPE", &RawFrame::empty()).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.shape(), (0, 0));
        assert!(series.tail(5).is_empty());
    }

    #[test]
    fn test_from_frame_missing_column() {
        let mut frame = flatten_columns(compound_frame());
        frame.columns[4] = ColumnLabel::Flat("Turnover".to_string());
        let err = PriceSeries::from_frame("AAPL", &frame).unwrap_err();
        assert!(err.to_string().contains("Volume"));
    }

    #[test]
    fn test_series_dates_strictly_increasing() {
        let mut bars = series_with_closes("X", &[1.0, 2.0, 3.0]).bars;
        bars.reverse();
        bars.push(bars[0].clone());
        let series = PriceSeries::new("X", bars);
        assert_eq!(series.len(), 3);
        assert!(series.bars.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_shape_and_tail() {
        let closes: Vec<f64> = (0..12).map(|i| 100.0 + i as f64).collect();
        let series = series_with_closes("AAPL", &closes);
        assert_eq!(series.shape(), (12, 5));

        let tail = series.tail(5);
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0].close, 107.0);
        assert_eq!(tail[4].close, 111.0);

        let short = series_with_closes("AAPL", &[1.0, 2.0]);
        assert_eq!(short.tail(5).len(), 2);
    }
}
