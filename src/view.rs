//! Render-ready projection of a [`DashboardReport`].
//!
//! Every front-end (terminal, desktop, browser) draws from a `DashboardView`
//! so the empty/non-empty decision is made exactly once, here.

use crate::config::{CSV_FILE_NAME, DATE_FORMAT, TAIL_ROWS};
use crate::data::{Bar, COLUMNS};
use crate::error::ExportError;
use crate::export;
use crate::forecast::Forecast;
use crate::pipeline::{DashboardReport, SeriesOutcome};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableRow {
    pub date: String,
    pub values: [f64; 5],
}

impl From<&Bar> for TableRow {
    fn from(bar: &Bar) -> Self {
        Self {
            date: bar.date.format(DATE_FORMAT).to_string(),
            values: bar.values(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    /// Unix seconds at midnight UTC, for plotting on a numeric axis.
    pub time: i64,
    pub close: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSeries {
    pub title: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastView {
    pub heading: String,
    pub next_index: usize,
    pub prediction: f64,
    pub lower: f64,
    pub upper: f64,
    pub predicted_label: String,
    pub range_label: String,
}

impl From<&Forecast> for ForecastView {
    fn from(forecast: &Forecast) -> Self {
        Self {
            heading: "Predict Next Day's Price".to_string(),
            next_index: forecast.next_index,
            prediction: forecast.prediction,
            lower: forecast.lower,
            upper: forecast.upper,
            predicted_label: forecast.predicted_label(),
            range_label: forecast.range_label(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CsvDownload {
    pub file_name: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DashboardView {
    NoData {
        symbol: String,
        warning: String,
    },
    Ready {
        symbol: String,
        heading: String,
        shape: (usize, usize),
        shape_label: String,
        columns: Vec<String>,
        tail: Vec<TableRow>,
        chart: ChartSeries,
        download: CsvDownload,
        forecast: Option<ForecastView>,
    },
}

pub fn no_data_warning() -> String {
    "No data found. Please check the stock symbol.".to_string()
}

impl DashboardView {
    pub fn from_report(report: &DashboardReport) -> Result<Self, ExportError> {
        let series = match &report.outcome {
            SeriesOutcome::Empty => {
                return Ok(Self::NoData {
                    symbol: report.request.symbol.clone(),
                    warning: no_data_warning(),
                });
            }
            SeriesOutcome::Data(series) => series,
        };

        let shape = series.shape();
        let chart = ChartSeries {
            title: format!("{} Closing Prices", series.symbol),
            points: series
                .bars
                .iter()
                .map(|b| ChartPoint {
                    date: b.date,
                    time: b
                        .date
                        .and_hms_opt(0, 0, 0)
                        .map(|dt| dt.and_utc().timestamp())
                        .unwrap_or_default(),
                    close: b.close,
                })
                .collect(),
        };

        Ok(Self::Ready {
            symbol: series.symbol.clone(),
            heading: format!("{} Stock Data", series.symbol),
            shape,
            shape_label: format!("Data shape: ({}, {})", shape.0, shape.1),
            columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
            tail: series.tail(TAIL_ROWS).iter().map(TableRow::from).collect(),
            chart,
            download: CsvDownload {
                file_name: CSV_FILE_NAME.to_string(),
                content: export::to_csv(series)?,
            },
            forecast: report.forecast.as_ref().map(ForecastView::from),
        })
    }

    pub fn forecast(&self) -> Option<&ForecastView> {
        match self {
            Self::Ready { forecast, .. } => forecast.as_ref(),
            Self::NoData { .. } => None,
        }
    }
}
