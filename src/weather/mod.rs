//! Weather API client for weatherapi.com
//!
//! Every outcome of a forecast request, including transport problems and
//! provider errors, is normalized into a [`ForecastResult`]. Callers never see
//! an `Err` from [`ForecastProvider::fetch`].

use crate::config::WeatherConfig;
use crate::models::{FORECAST_DAYS, ForecastResult};
use crate::{OutfitError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

pub mod weatherapi;

/// Shown when the weather API cannot be reached at all
pub const CONNECTIVITY_MESSAGE: &str =
    "ERRO! Não foi possível conectar ao servidor. Verifique sua conexão com a internet.";

/// Used when an error response carries no message of its own
pub const MISSING_ERROR_MESSAGE: &str = "Sem mensagem de erro fornecida pela API.";

/// Failure code for transport errors, where no HTTP status exists
pub const CONNECTIVITY_FAILURE_CODE: u16 = 0;

/// Source of multi-day forecasts for a resolved location
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn fetch(&self, location: &str) -> ForecastResult;
}

/// weatherapi.com forecast client
pub struct WeatherApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WeatherApiClient {
    /// Create a new client. The API key is resolved from config or `WEATHER_API_KEY`.
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        Self::with_api_key(config, config.resolved_api_key())
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(config: &WeatherConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("outfitcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OutfitError::config(format!("Failed to create HTTP client: {e}")))?;

        if api_key.is_empty() {
            warn!("No weather API key configured, requests will be rejected by the provider");
        }

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
        })
    }

    /// Translate a non-success response into a failure message
    fn error_failure(status: u16, body: &str) -> ForecastResult {
        let message = match serde_json::from_str::<weatherapi::ErrorResponse>(body) {
            Ok(error) => error
                .message()
                .unwrap_or_else(|| MISSING_ERROR_MESSAGE.to_string()),
            Err(_) if body.trim().is_empty() => MISSING_ERROR_MESSAGE.to_string(),
            Err(_) => body.trim().to_string(),
        };
        ForecastResult::failure(status, format!("ERRO! {status} - {message}"))
    }

    /// Parse a success body; a malformed body is a failure carrying the raw text
    fn parse_success(status: u16, body: &str) -> ForecastResult {
        let response: weatherapi::ForecastResponse = match serde_json::from_str(body) {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to parse weather response: {}", e);
                return ForecastResult::failure(
                    status,
                    format!("ERRO! Resposta inválida da API climática: {body}"),
                );
            }
        };

        let days = response.days();
        let returned = days.len();
        ForecastResult::from_days(days).unwrap_or_else(|| {
            warn!("Weather API returned {} days, expected {}", returned, FORECAST_DAYS);
            ForecastResult::failure(
                status,
                format!(
                    "ERRO! A API climática retornou {returned} dia(s) de previsão, \
                     esperados {FORECAST_DAYS}: {body}"
                ),
            )
        })
    }
}

#[async_trait]
impl ForecastProvider for WeatherApiClient {
    #[instrument(skip(self))]
    async fn fetch(&self, location: &str) -> ForecastResult {
        info!("Getting {}-day forecast for {}", FORECAST_DAYS, location);
        let start_time = Instant::now();

        let days = FORECAST_DAYS.to_string();
        let response = match self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", location),
                ("days", days.as_str()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Weather API request failed: {}", e);
                return ForecastResult::failure(CONNECTIVITY_FAILURE_CODE, CONNECTIVITY_MESSAGE);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read weather API response: {}", e);
                return ForecastResult::failure(CONNECTIVITY_FAILURE_CODE, CONNECTIVITY_MESSAGE);
            }
        };

        debug!(
            "Weather API answered {} in {:.3}s",
            status,
            start_time.elapsed().as_secs_f64()
        );

        if status.is_success() {
            Self::parse_success(status.as_u16(), &body)
        } else {
            Self::error_failure(status.as_u16(), &body)
        }
    }
}
