//! The forecast to outfit pipeline shared by the console and the web UI

use crate::config::OutfitConfig;
use crate::geo::{CityCompleter, GeoDbClient};
use crate::models::{ForecastResult, LocationCandidate};
use crate::recommendation::{RecommendationEngine, Recommender};
use crate::report::{self, ChannelReport, ReportEvent, ReportSink};
use crate::weather::{ForecastProvider, WeatherApiClient};
use crate::{OutfitError, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{instrument, warn};

/// City lookup, forecast and recommendation behind one handle
#[derive(Clone)]
pub struct OutfitService {
    completer: Arc<dyn CityCompleter>,
    forecasts: Arc<dyn ForecastProvider>,
    recommender: Arc<dyn Recommender>,
}

impl OutfitService {
    pub fn new(
        completer: Arc<dyn CityCompleter>,
        forecasts: Arc<dyn ForecastProvider>,
        recommender: Arc<dyn Recommender>,
    ) -> Self {
        Self {
            completer,
            forecasts,
            recommender,
        }
    }

    /// Wire the real API clients and the process-wide recommendation engine
    pub fn from_config(config: &OutfitConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(GeoDbClient::new(&config.geo)?),
            Arc::new(WeatherApiClient::new(&config.weather)?),
            Arc::new(RecommendationEngine::global(&config.model)),
        ))
    }

    #[must_use]
    pub fn completer(&self) -> Arc<dyn CityCompleter> {
        Arc::clone(&self.completer)
    }

    pub async fn suggest(&self, partial: &str) -> Vec<LocationCandidate> {
        self.completer.suggest(partial).await
    }

    pub async fn forecast(&self, location: &str) -> ForecastResult {
        self.forecasts.fetch(location).await
    }

    /// Fetch the forecast for `location` and render it into `sink`
    #[instrument(skip(self, sink))]
    pub async fn report(&self, location: &str, sink: &mut dyn ReportSink) -> Result<()> {
        let location = validate_location(location)?;
        let forecast = self.forecast(location).await;
        report::present(location, &forecast, self.recommender.as_ref(), sink).await
    }

    /// Start a report in the background and receive its pieces as they are rendered.
    ///
    /// The stream always ends with [`ReportEvent::Done`] or [`ReportEvent::Error`].
    /// Dropping the receiver stops generation before the next day.
    pub fn stream_report(&self, location: &str) -> Result<mpsc::UnboundedReceiver<ReportEvent>> {
        let location = validate_location(location)?.to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let service = self.clone();

        tokio::spawn(async move {
            let mut sink = ChannelReport::new(tx);
            let outcome = service.report(&location, &mut sink).await;
            if let Err(e) = &outcome {
                warn!("Streamed report for {} stopped: {}", location, e);
            }
            sink.finish(&outcome);
        });
        Ok(rx)
    }
}

fn validate_location(location: &str) -> Result<&str> {
    let location = location.trim();
    if location.is_empty() {
        return Err(OutfitError::validation("Location cannot be empty"));
    }
    Ok(location)
}
