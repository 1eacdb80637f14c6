//! City autocomplete backed by the GeoDB cities API
//!
//! Suggestions are best effort: any network or parse problem yields an empty
//! list, the same as "no matches".

use crate::cache::TtlCache;
use crate::config::GeoConfig;
use crate::models::LocationCandidate;
use crate::{OutfitError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Shortest input that triggers a lookup
pub const MIN_QUERY_CHARS: usize = 2;

/// Anything that turns partially typed text into ranked city candidates
#[async_trait]
pub trait CityCompleter: Send + Sync {
    async fn suggest(&self, partial: &str) -> Vec<LocationCandidate>;
}

#[derive(Debug, Deserialize)]
struct CitiesResponse {
    data: Vec<City>,
}

#[derive(Debug, Deserialize)]
struct City {
    name: String,
    country: String,
}

/// GeoDB cities API client
pub struct GeoDbClient {
    client: Client,
    base_url: String,
    country_ids: String,
    limit: usize,
    cache: TtlCache<Vec<LocationCandidate>>,
    cache_ttl: Duration,
}

impl GeoDbClient {
    /// Create a new client
    pub fn new(config: &GeoConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("outfitcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OutfitError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            country_ids: config.country_ids.clone(),
            limit: config.limit as usize,
            cache: TtlCache::new(),
            cache_ttl: Duration::from_secs(config.cache_ttl_seconds),
        })
    }

    async fn lookup(&self, query: &str) -> Option<Vec<LocationCandidate>> {
        let limit = self.limit.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("limit", limit.as_str()),
                ("namePrefix", query),
                ("countryIds", self.country_ids.as_str()),
            ])
            .send()
            .await
            .map_err(|e| debug!("City lookup request failed: {}", e))
            .ok()?;

        if !response.status().is_success() {
            debug!("City lookup returned status {}", response.status());
            return None;
        }

        let body: CitiesResponse = response
            .json()
            .await
            .map_err(|e| debug!("City lookup parse error: {}", e))
            .ok()?;

        Some(
            body.data
                .iter()
                .take(self.limit)
                .map(|city| LocationCandidate::new(&city.name, &city.country, query))
                .collect(),
        )
    }
}

#[async_trait]
impl CityCompleter for GeoDbClient {
    #[instrument(skip(self))]
    async fn suggest(&self, partial: &str) -> Vec<LocationCandidate> {
        let query = partial.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }

        if !self.cache_ttl.is_zero() {
            if let Some(cached) = self.cache.get(query) {
                return cached;
            }
        }

        let candidates = self.lookup(query).await.unwrap_or_default();
        debug!("Found {} city candidates for '{}'", candidates.len(), query);

        if !self.cache_ttl.is_zero() && !candidates.is_empty() {
            self.cache.put(query, candidates.clone(), self.cache_ttl);
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, cache_ttl_seconds: u64) -> GeoDbClient {
        let config = GeoConfig {
            base_url: format!("{}/v1/geo/cities", server.uri()),
            cache_ttl_seconds,
            ..GeoConfig::default()
        };
        GeoDbClient::new(&config).unwrap()
    }

    fn cities(names: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "data": names
                .iter()
                .map(|n| serde_json::json!({"name": n, "country": "Brazil", "id": 1}))
                .collect::<Vec<_>>()
        })
    }

    #[rstest]
    #[case("")]
    #[case("S")]
    #[case(" S ")]
    #[tokio::test]
    async fn test_short_input_skips_network(#[case] partial: &str) {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cities(&["Santos"])))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, 0);
        assert!(client.suggest(partial).await.is_empty());
    }

    #[tokio::test]
    async fn test_suggestions_follow_provider_order() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("namePrefix", "Sa"))
            .and(query_param("limit", "5"))
            .and(query_param("countryIds", "BR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cities(&[
                "Salvador",
                "Santos",
                "São Paulo",
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, 0);
        let suggestions = client.suggest("Sa").await;

        let names: Vec<_> = suggestions.iter().map(|c| c.display.as_str()).collect();
        assert_eq!(
            names,
            vec!["Salvador, Brazil", "Santos, Brazil", "São Paulo, Brazil"]
        );
        assert!(suggestions.iter().all(|c| c.replace_len == 2));
    }

    #[tokio::test]
    async fn test_results_are_capped_at_limit() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cities(&[
                "A1", "A2", "A3", "A4", "A5", "A6", "A7",
            ])))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, 0);
        assert_eq!(client.suggest("A1").await.len(), 5);
    }

    #[rstest]
    #[case(ResponseTemplate::new(500))]
    #[case(ResponseTemplate::new(429).set_body_string("slow down"))]
    #[case(ResponseTemplate::new(200).set_body_string("not json"))]
    #[case(ResponseTemplate::new(200).set_body_json(serde_json::json!({"errors": []})))]
    #[tokio::test]
    async fn test_failures_degrade_to_empty(#[case] template: ResponseTemplate) {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(template)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, 0);
        assert!(client.suggest("Recife").await.is_empty());
    }

    #[tokio::test]
    async fn test_connection_error_degrades_to_empty() {
        let config = GeoConfig {
            base_url: "http://127.0.0.1:9/v1/geo/cities".to_string(),
            timeout_seconds: 2,
            ..GeoConfig::default()
        };
        let client = GeoDbClient::new(&config).unwrap();
        assert!(client.suggest("Recife").await.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_query_is_memoized() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cities(&["Curitiba"])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, 60);
        let first = client.suggest("Curi").await;
        let second = client.suggest("Curi").await;
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }
}
