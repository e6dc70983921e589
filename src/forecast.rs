use crate::config::ForecastSettings;
use crate::data::PriceSeries;
use serde::Serialize;

/// Zero-based positional index `0, 1, .., n-1`; calendar dates play no part.
pub fn day_index(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64).collect()
}

/// Ordinary least squares line `y = slope * x + intercept`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Returns `None` for fewer than two points or when every `x` is identical.
    pub fn ols(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.len() != ys.len() || xs.len() < 2 {
            return None;
        }

        let n = xs.len() as f64;
        let x_mean = xs.iter().sum::<f64>() / n;
        let y_mean = ys.iter().sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (&x, &y) in xs.iter().zip(ys) {
            numerator += (x - x_mean) * (y - y_mean);
            denominator += (x - x_mean) * (x - x_mean);
        }

        if denominator.abs() < 1e-10 {
            return None;
        }

        let slope = numerator / denominator;
        Some(Self {
            slope,
            intercept: y_mean - slope * x_mean,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Next-day close extrapolated from the linear trend.
///
/// `lower`/`upper` are `prediction ∓ margin` with a fixed margin; they are a
/// display band, not a statistical interval.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Forecast {
    pub next_index: usize,
    pub prediction: f64,
    pub lower: f64,
    pub upper: f64,
    pub fit: LinearFit,
}

impl Forecast {
    pub fn from_prediction(next_index: usize, fit: LinearFit, margin: f64) -> Self {
        let prediction = fit.predict(next_index as f64);
        Self {
            next_index,
            prediction,
            lower: prediction - margin,
            upper: prediction + margin,
            fit,
        }
    }

    pub fn predicted_label(&self) -> String {
        format!("${:.2}", self.prediction)
    }

    pub fn range_label(&self) -> String {
        format!("Range: ${:.2} – ${:.2}", self.lower, self.upper)
    }
}

/// Fits close against day index and predicts index `n`.
///
/// Runs only when the series holds more than `settings.min_rows` bars.
pub fn forecast_next_close(series: &PriceSeries, settings: &ForecastSettings) -> Option<Forecast> {
    let n = series.len();
    if n <= settings.min_rows {
        return None;
    }

    let fit = LinearFit::ols(&day_index(n), &series.closes())?;
    Some(Forecast::from_prediction(n, fit, settings.margin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::series_with_closes;

    fn wavy_closes(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 150.0 + 0.4 * i as f64 + if i % 2 == 0 { 1.5 } else { -1.5 })
            .collect()
    }

    #[test]
    fn test_day_index() {
        assert_eq!(day_index(0), Vec::<f64>::new());
        assert_eq!(day_index(4), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_day_index_ignores_calendar_gaps() {
        let mut series = series_with_closes("AAPL", &[1.0, 2.0, 3.0]);
        // Move the last bar across a long weekend.
        series.bars[2].date = series.bars[1].date + chrono::Duration::days(4);
        assert_eq!(day_index(series.len()), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_ols_perfect_line() {
        let xs = day_index(5);
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x + 7.0).collect();
        let fit = LinearFit::ols(&xs, &ys).unwrap();
        assert!((fit.slope - 3.0).abs() < 1e-12);
        assert!((fit.intercept - 7.0).abs() < 1e-12);
        assert!((fit.predict(5.0) - 22.0).abs() < 1e-12);
    }

    #[test]
    fn test_ols_degenerate_inputs() {
        assert!(LinearFit::ols(&[1.0], &[2.0]).is_none());
        assert!(LinearFit::ols(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(LinearFit::ols(&[1.0, 2.0], &[1.0]).is_none());
    }

    #[test]
    fn test_forecast_threshold() {
        let settings = ForecastSettings::default();
        let at_threshold = series_with_closes("AAPL", &wavy_closes(30));
        assert!(forecast_next_close(&at_threshold, &settings).is_none());

        let above = series_with_closes("AAPL", &wavy_closes(31));
        let forecast = forecast_next_close(&above, &settings).unwrap();
        assert_eq!(forecast.next_index, 31);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let settings = ForecastSettings::with_overrides(Some(3), None);
        let series = series_with_closes("AAPL", &[1.0, 2.0, 3.0, 4.0]);
        let forecast = forecast_next_close(&series, &settings).unwrap();
        assert!((forecast.prediction - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_band_is_constant_offset() {
        for n in [31, 60, 250] {
            let series = series_with_closes("AAPL", &wavy_closes(n));
            let f = forecast_next_close(&series, &ForecastSettings::default()).unwrap();
            assert_eq!(f.lower, f.prediction - 1.25);
            assert_eq!(f.upper, f.prediction + 1.25);
        }

        let wide = ForecastSettings::with_overrides(None, Some(4.0));
        let series = series_with_closes("AAPL", &wavy_closes(40));
        let f = forecast_next_close(&series, &wide).unwrap();
        assert_eq!(f.upper, f.prediction + 4.0);
    }

    #[test]
    fn test_labels() {
        let fit = LinearFit { slope: 0.5, intercept: 100.0 };
        let f = Forecast::from_prediction(40, fit, 1.25);
        assert_eq!(f.predicted_label(), "$120.00");
        assert_eq!(f.range_label(), "Range: $118.75 – $121.25");
    }
}
