//! Lifecycle Forecaster
//!
//! Linear-trend utilization extrapolation and a seasonal maintenance cost
//! projection. Forecast steps are 30-day "months".

use std::f64::consts::PI;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

const MIN_TREND_POINTS: usize = 3;
const FALLBACK_UTILIZATION: f64 = 0.5;
const UTILIZATION_FLOOR: f64 = 0.1;
const UTILIZATION_CEILING: f64 = 1.0;

const DEFAULT_MAINTENANCE_COST: f64 = 500.0;
const SEASONAL_AMPLITUDE: f64 = 0.1;
const MONTHLY_COST_GROWTH: f64 = 0.02;

const DAYS_PER_STEP: i64 = 30;
const BAND_HALF_WIDTH: f64 = 0.1;
const CONFIDENCE_LEVEL: f64 = 0.8;
const RELIABLE_HISTORY_LEN: usize = 6;

/// One historical observation; either value may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleRecord {
    #[serde(default)]
    pub utilization: Option<f64>,
    #[serde(default)]
    pub maintenance_cost: Option<f64>,
    /// Informational only; unrecognized values read as `None`
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// RFC 3339, then naive date-time (taken as UTC), then a plain date
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.and_utc());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(raw)) => parse_timestamp(&raw),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    UtilizationPercentage,
    MaintenanceCost,
}

impl Metric {
    pub fn unit(&self) -> Unit {
        match self {
            Metric::UtilizationPercentage => Unit::Percent,
            Metric::MaintenanceCost => Unit::Dollars,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Percent,
    Dollars,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    Low,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: DateTime<Utc>,
    pub predicted_value: f64,
    pub metric: Metric,
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub date: DateTime<Utc>,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub utilization_trend: Trend,
    pub cost_trend: Trend,
    pub forecast_reliability: Reliability,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleForecast {
    pub predictions: Vec<ForecastPoint>,
    pub confidence_intervals: Vec<ConfidenceInterval>,
    pub trend_analysis: TrendAnalysis,
}

/// Least-squares slope of `values` against their index positions
fn trend_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let (num, den) = values.iter().enumerate().fold((0.0, 0.0), |(num, den), (i, &y)| {
        let dx = i as f64 - mean_x;
        (num + dx * (y - mean_y), den + dx * dx)
    });
    num / den
}

fn trend_of(values: &[f64]) -> Trend {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 && last > first => Trend::Increasing,
        _ => Trend::Stable,
    }
}

/// Extrapolate `periods` future values from the series' linear trend.
/// Fewer than 3 points yields a flat 0.5 forecast.
pub fn forecast_utilization(series: &[f64], periods: usize) -> Vec<f64> {
    if series.len() < MIN_TREND_POINTS {
        return vec![FALLBACK_UTILIZATION; periods];
    }

    let slope = trend_slope(series);
    let last = series[series.len() - 1];
    (1..=periods)
        .map(|i| (last + slope * i as f64).clamp(UTILIZATION_FLOOR, UTILIZATION_CEILING))
        .collect()
}

/// Projected maintenance cost for forecast step `step` (0-indexed)
pub fn projected_cost(average_cost: f64, step: usize) -> f64 {
    let i = step as f64;
    let seasonal_factor = 1.0 + SEASONAL_AMPLITUDE * (2.0 * PI * i / 12.0).sin();
    let trend_factor = 1.0 + MONTHLY_COST_GROWTH * i;
    average_cost * seasonal_factor * trend_factor
}

pub fn generate_lifecycle_forecast(
    history: &[LifecycleRecord],
    months: usize,
) -> LifecycleForecast {
    generate_lifecycle_forecast_at(history, months, Utc::now())
}

/// Forecast as if generated at `now`
pub fn generate_lifecycle_forecast_at(
    history: &[LifecycleRecord],
    months: usize,
    now: DateTime<Utc>,
) -> LifecycleForecast {
    let utilization: Vec<f64> = history.iter().filter_map(|r| r.utilization).collect();
    let costs: Vec<f64> = history.iter().filter_map(|r| r.maintenance_cost).collect();

    let utilization_forecast = forecast_utilization(&utilization, months);
    let average_cost = if costs.is_empty() {
        DEFAULT_MAINTENANCE_COST
    } else {
        costs.iter().sum::<f64>() / costs.len() as f64
    };

    let mut predictions = Vec::with_capacity(months * 2);
    let mut confidence_intervals = Vec::with_capacity(months);

    for (i, &value) in utilization_forecast.iter().enumerate() {
        let date = now + Duration::days(DAYS_PER_STEP * (i as i64 + 1));

        predictions.push(ForecastPoint {
            date,
            predicted_value: value,
            metric: Metric::UtilizationPercentage,
            unit: Metric::UtilizationPercentage.unit(),
        });
        predictions.push(ForecastPoint {
            date,
            predicted_value: projected_cost(average_cost, i),
            metric: Metric::MaintenanceCost,
            unit: Metric::MaintenanceCost.unit(),
        });

        confidence_intervals.push(ConfidenceInterval {
            date,
            lower_bound: (value - BAND_HALF_WIDTH).max(0.0),
            upper_bound: (value + BAND_HALF_WIDTH).min(1.0),
            confidence_level: CONFIDENCE_LEVEL,
        });
    }

    let forecast_reliability = if history.len() > RELIABLE_HISTORY_LEN {
        Reliability::Medium
    } else {
        Reliability::Low
    };

    LifecycleForecast {
        predictions,
        confidence_intervals,
        trend_analysis: TrendAnalysis {
            utilization_trend: trend_of(&utilization),
            cost_trend: trend_of(&costs),
            forecast_reliability,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{:?} != {:?}", actual, expected);
        }
    }

    fn record(utilization: Option<f64>, maintenance_cost: Option<f64>) -> LifecycleRecord {
        LifecycleRecord {
            utilization,
            maintenance_cost,
            timestamp: None,
        }
    }

    #[test]
    fn test_short_series_falls_back() {
        assert_eq!(forecast_utilization(&[], 5), vec![0.5; 5]);
        assert_eq!(forecast_utilization(&[0.5, 0.6], 5), vec![0.5; 5]);
    }

    #[test]
    fn test_rising_series_is_clamped() {
        assert_close(&forecast_utilization(&[0.2, 0.4, 0.6], 3), &[0.8, 1.0, 1.0]);
    }

    #[test]
    fn test_falling_series_hits_floor() {
        assert_close(&forecast_utilization(&[0.5, 0.3, 0.1], 2), &[0.1, 0.1]);
    }

    #[test]
    fn test_noisy_series_uses_least_squares() {
        // slope of [0.5, 0.7, 0.6, 0.8] is 0.08
        assert_close(&forecast_utilization(&[0.5, 0.7, 0.6, 0.8], 2), &[0.88, 0.96]);
    }

    #[test]
    fn test_zero_periods() {
        assert!(forecast_utilization(&[0.1, 0.2, 0.3], 0).is_empty());
    }

    #[test]
    fn test_projected_cost_factors() {
        assert!((projected_cost(500.0, 0) - 500.0).abs() < 1e-9);
        // sin(pi/2) = 1 at step 3: 500 * 1.1 * 1.06
        assert!((projected_cost(500.0, 3) - 583.0).abs() < 1e-9);
    }

    #[test]
    fn test_lifecycle_forecast_shape() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let history = vec![
            record(Some(0.2), Some(400.0)),
            record(Some(0.4), None),
            record(None, Some(600.0)),
            record(Some(0.6), None),
        ];

        let forecast = generate_lifecycle_forecast_at(&history, 3, now);

        assert_eq!(forecast.predictions.len(), 6);
        assert_eq!(forecast.confidence_intervals.len(), 3);

        let first = &forecast.predictions[0];
        assert_eq!(first.metric, Metric::UtilizationPercentage);
        assert_eq!(first.unit, Unit::Percent);
        assert_eq!(first.date, now + Duration::days(30));
        assert!((first.predicted_value - 0.8).abs() < 1e-9);

        let cost = &forecast.predictions[1];
        assert_eq!(cost.metric, Metric::MaintenanceCost);
        assert_eq!(cost.unit, Unit::Dollars);
        assert!((cost.predicted_value - 500.0).abs() < 1e-9);

        assert_eq!(forecast.predictions[4].date, now + Duration::days(90));

        let band = &forecast.confidence_intervals[0];
        assert!((band.lower_bound - 0.7).abs() < 1e-9);
        assert!((band.upper_bound - 0.9).abs() < 1e-9);
        assert_eq!(band.confidence_level, 0.8);
        // clipped at 1.0
        assert_eq!(forecast.confidence_intervals[1].upper_bound, 1.0);

        assert_eq!(forecast.trend_analysis.utilization_trend, Trend::Increasing);
        assert_eq!(forecast.trend_analysis.cost_trend, Trend::Increasing);
        assert_eq!(forecast.trend_analysis.forecast_reliability, Reliability::Low);
    }

    #[test]
    fn test_empty_history_uses_defaults() {
        let forecast = generate_lifecycle_forecast(&[], 2);

        let values: Vec<f64> = forecast.predictions.iter().map(|p| p.predicted_value).collect();
        assert!((values[0] - 0.5).abs() < 1e-9);
        assert!((values[1] - 500.0).abs() < 1e-9);
        assert_eq!(forecast.trend_analysis.utilization_trend, Trend::Stable);
        assert_eq!(forecast.trend_analysis.cost_trend, Trend::Stable);
    }

    #[test]
    fn test_reliability_needs_more_than_six_records() {
        let six = vec![record(Some(0.5), None); 6];
        let seven = vec![record(Some(0.5), None); 7];

        assert_eq!(
            generate_lifecycle_forecast(&six, 1).trend_analysis.forecast_reliability,
            Reliability::Low
        );
        assert_eq!(
            generate_lifecycle_forecast(&seven, 1).trend_analysis.forecast_reliability,
            Reliability::Medium
        );
    }

    #[test]
    fn test_flat_or_falling_trend_is_stable() {
        let history = vec![record(Some(0.7), Some(900.0)), record(Some(0.7), Some(300.0))];
        let analysis = generate_lifecycle_forecast(&history, 1).trend_analysis;

        assert_eq!(analysis.utilization_trend, Trend::Stable);
        assert_eq!(analysis.cost_trend, Trend::Stable);
    }

    #[test]
    fn test_record_ignores_unknown_keys() {
        let record: LifecycleRecord =
            serde_json::from_str(r#"{"utilization": 0.4, "location": "depot-3"}"#).unwrap();
        assert_eq!(record.utilization, Some(0.4));
        assert_eq!(record.maintenance_cost, None);
    }

    #[test]
    fn test_timestamp_accepts_naive_forms() {
        let records: Vec<LifecycleRecord> = serde_json::from_str(
            r#"[
                {"utilization": 0.4, "timestamp": "2024-01-15T10:00:00.123456"},
                {"utilization": 0.5, "timestamp": "2024-01-15"},
                {"utilization": 0.6, "timestamp": "2024-01-15T10:00:00Z"},
                {"utilization": 0.7, "timestamp": "last tuesday"},
                {"utilization": 0.8, "timestamp": 1705312800}
            ]"#,
        )
        .unwrap();

        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap()
            .and_utc();
        assert_eq!(records[0].timestamp.map(|t| t.timestamp()), Some(expected.timestamp()));
        assert_eq!(records[1].timestamp.map(|t| t.date_naive()), Some(expected.date_naive()));
        assert_eq!(records[2].timestamp, Some(expected));
        assert_eq!(records[3].timestamp, None);
        assert_eq!(records[4].timestamp, None);
        assert_eq!(records[4].utilization, Some(0.8));
    }
}
