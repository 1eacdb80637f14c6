//! `Outfitcast` - Clothing recommendations from a three day weather forecast
//!
//! This library provides city autocomplete, forecast retrieval, language model
//! backed outfit recommendations and the console and web front ends that
//! present them one day at a time.

pub mod api;
pub mod cache;
pub mod config;
pub mod console;
pub mod error;
pub mod geo;
pub mod logging;
pub mod models;
pub mod recommendation;
pub mod report;
pub mod service;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use config::OutfitConfig;
pub use error::OutfitError;
pub use geo::{CityCompleter, GeoDbClient};
pub use models::{DayForecast, ForecastResult, LocationCandidate};
pub use recommendation::{RecommendationEngine, Recommender};
pub use report::{ConsoleReport, ReportEvent, ReportSink};
pub use service::OutfitService;
pub use weather::{ForecastProvider, WeatherApiClient};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, OutfitError>;
