//! weatherapi.com response structures and conversion utilities

use crate::models::DayForecast;
use chrono::NaiveDate;
use serde::Deserialize;

/// Forecast response from weatherapi.com, only the fields we read
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub forecast: Forecast,
}

#[derive(Debug, Deserialize)]
pub struct Forecast {
    pub forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub day: Day,
}

#[derive(Debug, Deserialize)]
pub struct Day {
    pub mintemp_c: f64,
    pub maxtemp_c: f64,
    pub condition: Condition,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    pub text: String,
}

/// Error body, e.g. `{"error": {"code": 2006, "message": "API key is invalid."}}`
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub message: Option<String>,
}

impl From<&ForecastDay> for DayForecast {
    fn from(value: &ForecastDay) -> Self {
        DayForecast::new(
            value.date,
            value.day.mintemp_c,
            value.day.maxtemp_c,
            &value.day.condition.text,
        )
    }
}

impl ForecastResponse {
    #[must_use]
    pub fn days(&self) -> Vec<DayForecast> {
        self.forecast.forecastday.iter().map(DayForecast::from).collect()
    }
}

impl ErrorResponse {
    /// Provider supplied message, if any
    #[must_use]
    pub fn message(self) -> Option<String> {
        self.error
            .and_then(|e| e.message)
            .filter(|m| !m.trim().is_empty())
    }
}
