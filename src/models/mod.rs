//! Data models for the outfitcast application
//!
//! This module contains the core domain models organized by concern:
//! - Location: autocomplete candidates for a typed city name
//! - Forecast: per-day weather facts and the forecast result union

pub mod forecast;
pub mod location;

// Re-export all public types for convenient access
pub use forecast::{DayForecast, FORECAST_DAYS, ForecastResult};
pub use location::LocationCandidate;
