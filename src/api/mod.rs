use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Json, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures::{Stream, stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::{OutfitError, VERSION, models::LocationCandidate, service::OutfitService};

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub city: String,
}

#[derive(Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Error body returned by the API
struct ApiError(OutfitError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            OutfitError::Validation { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.user_message() }))).into_response()
    }
}

pub fn router(service: OutfitService) -> Router {
    Router::new()
        .route("/suggestions", get(get_suggestions))
        .route("/report", get(get_report))
        .route("/health", get(get_health))
        .with_state(service)
}

async fn get_suggestions(
    State(service): State<OutfitService>,
    Query(query): Query<SuggestionQuery>,
) -> Json<Vec<LocationCandidate>> {
    Json(service.suggest(&query.q).await)
}

/// Server-sent events, one JSON `ReportEvent` per message, sent as each day is ready
async fn get_report(
    State(service): State<OutfitService>,
    Query(query): Query<ReportQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let rx = service.stream_report(&query.city).map_err(|e| {
        warn!("Rejected report request: {}", e);
        ApiError(e)
    })?;

    let events = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Event::default().json_data(&event), rx))
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn get_health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: VERSION.to_string(),
    })
}
