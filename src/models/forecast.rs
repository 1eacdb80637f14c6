//! Daily forecast model and the forecast result union

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of forecast days requested from the weather provider
pub const FORECAST_DAYS: usize = 3;

/// Weather facts for a single day
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DayForecast {
    /// Calendar date of the forecast
    pub date: NaiveDate,
    /// Minimum temperature in Celsius
    pub min_temp_c: f64,
    /// Maximum temperature in Celsius
    pub max_temp_c: f64,
    /// Condition label, lowercase and trimmed
    pub condition: String,
}

impl DayForecast {
    /// Create a normalized day forecast.
    ///
    /// Swapped bounds are reordered so that `min_temp_c <= max_temp_c` always holds.
    #[must_use]
    pub fn new(date: NaiveDate, min_temp_c: f64, max_temp_c: f64, condition: &str) -> Self {
        let (min_temp_c, max_temp_c) = if min_temp_c <= max_temp_c {
            (min_temp_c, max_temp_c)
        } else {
            (max_temp_c, min_temp_c)
        };

        Self {
            date,
            min_temp_c,
            max_temp_c,
            condition: condition.trim().to_lowercase(),
        }
    }

    /// Format the temperature range, e.g. "min 18.0° e máx 27.0°"
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("min {:.1}° e máx {:.1}°", self.min_temp_c, self.max_temp_c)
    }

    /// Format the date as YYYY-MM-DD
    #[must_use]
    pub fn format_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Outcome of a forecast request. Recoverable failures are data, not errors.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ForecastResult {
    /// Chronologically ordered days, exactly [`FORECAST_DAYS`] of them
    Success { days: Vec<DayForecast> },
    /// Provider or transport failure with a user-facing message
    Failure { code: u16, message: String },
}

impl ForecastResult {
    /// Build a success, sorting days by date and keeping the first [`FORECAST_DAYS`].
    ///
    /// Returns `None` when fewer than [`FORECAST_DAYS`] days are given.
    #[must_use]
    pub fn from_days(mut days: Vec<DayForecast>) -> Option<Self> {
        if days.len() < FORECAST_DAYS {
            return None;
        }
        days.sort_by_key(|day| day.date);
        days.truncate(FORECAST_DAYS);
        Some(Self::Success { days })
    }

    /// Build a failure
    pub fn failure<S: Into<String>>(code: u16, message: S) -> Self {
        Self::Failure {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_condition_is_normalized() {
        let day = DayForecast::new(date(1), 18.0, 27.0, "  Patchy Rain Nearby ");
        assert_eq!(day.condition, "patchy rain nearby");
    }

    #[test]
    fn test_swapped_bounds_are_reordered() {
        let day = DayForecast::new(date(1), 27.0, 18.0, "sunny");
        assert_eq!(day.min_temp_c, 18.0);
        assert_eq!(day.max_temp_c, 27.0);
    }

    #[test]
    fn test_format_temperature() {
        let day = DayForecast::new(date(2), 15.0, 20.4, "rainy");
        assert_eq!(day.format_temperature(), "min 15.0° e máx 20.4°");
        assert_eq!(day.format_date(), "2024-01-02");
    }

    #[test]
    fn test_from_days_sorts_and_truncates() {
        let result = ForecastResult::from_days(vec![
            DayForecast::new(date(3), 10.0, 16.0, "cloudy"),
            DayForecast::new(date(1), 18.0, 27.0, "sunny"),
            DayForecast::new(date(4), 9.0, 12.0, "fog"),
            DayForecast::new(date(2), 15.0, 20.0, "rainy"),
        ]);

        let Some(ForecastResult::Success { days }) = result else {
            panic!("expected success");
        };
        let dates: Vec<_> = days.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date(1), date(2), date(3)]);
    }

    #[test]
    fn test_from_days_rejects_short_forecast() {
        assert!(ForecastResult::from_days(Vec::new()).is_none());
        assert!(ForecastResult::from_days(vec![
            DayForecast::new(date(1), 18.0, 27.0, "sunny"),
            DayForecast::new(date(2), 15.0, 20.0, "rainy"),
        ])
        .is_none());
    }

    #[test]
    fn test_failure_serializes_with_status_tag() {
        let failure = ForecastResult::failure(400, "ERRO! 400 - Invalid API key.");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["code"], 400);
        assert!(!failure.is_success());
    }
}
