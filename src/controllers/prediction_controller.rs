use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use tracing::{error, info, warn};
use utoipa::IntoParams;

use crate::models::prediction::{
    ErrorBody, HealthStatus, HistoryResponse, NewPredictionRecord, PredictRequest,
    PredictResponse, PredictionSummary, SolarParameters,
};
use crate::services::predictor::{PredictError, round2, validate_location};
use crate::services::solar_algorithm;
use crate::services::weather_service::WeatherError;
use crate::shared_state::AppState;

/// Error reply in the `{error, message}` shape used by every endpoint.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self { status, error, message: message.into() }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.error.to_string(), message: self.message };
        (self.status, Json(body)).into_response()
    }
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        match e {
            PredictError::EmptyLocation => {
                ApiError::new(StatusCode::BAD_REQUEST, "Invalid city name", "City name cannot be empty")
            }
            PredictError::NonFiniteInput { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "Invalid input", e.to_string())
            }
        }
    }
}

impl From<WeatherError> for ApiError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::CityNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "City not found", e.to_string())
            }
            WeatherError::MissingApiKey => {
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Weather service unavailable", e.to_string())
            }
            WeatherError::Status(_) | WeatherError::Http(_) | WeatherError::Incomplete(_) => {
                ApiError::new(StatusCode::BAD_GATEWAY, "Weather service unavailable", e.to_string())
            }
        }
    }
}

/// POST /api/predict
/// Predict solar power output for a city
///
/// Fetches current weather for the city, computes plane-of-array irradiance
/// for its position and time, and runs the trained model. The `quality`
/// field tells whether the prediction ran at full fidelity.
#[utoipa::path(
    post,
    path = "/api/predict",
    request_body = PredictRequest,
    responses(
        (status = 200, description = "Prediction result", body = PredictResponse),
        (status = 400, description = "Missing or empty city", body = ErrorBody),
        (status = 404, description = "City not found", body = ErrorBody),
        (status = 502, description = "Weather service failure", body = ErrorBody),
        (status = 503, description = "Weather service not configured", body = ErrorBody)
    )
)]
pub async fn predict_solar_power(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let city = match payload {
        Ok(Json(PredictRequest { city: Some(city) })) => city,
        _ => {
            return Err(ApiError::new(StatusCode::BAD_REQUEST, "Invalid request", "City name is required"));
        }
    };
    let city = validate_location(&city)?;

    let obs = state.weather.get_weather_by_city(city).await?;

    let now = Utc::now();
    let offset = FixedOffset::east_opt(obs.location.utc_offset_seconds).unwrap_or_else(|| Utc.fix());
    let solar = solar_algorithm::solar_parameters(
        obs.location.latitude,
        obs.location.longitude,
        now,
        obs.snapshot.clouds,
        &state.config.panel,
    );

    let result = state.predictor.predict_for_location(
        &obs.location.city,
        &obs.snapshot,
        &solar,
        now.with_timezone(&offset),
    )?;

    if result.quality.is_degraded() {
        warn!(
            "Degraded prediction for {}: {:?}",
            result.location,
            result.quality.reasons()
        );
    }

    let record = NewPredictionRecord::from_result(&result, &obs.location);
    let store = state.store.clone();
    match tokio::task::spawn_blocking(move || store.insert(&record)).await {
        Ok(Ok(id)) => info!("Prediction saved with ID: {}", id),
        Ok(Err(e)) => warn!("Could not save prediction to database: {}", e),
        Err(e) => warn!("Could not save prediction to database: {}", e),
    }

    Ok(Json(PredictResponse {
        success: true,
        prediction: PredictionSummary {
            city: obs.location.city,
            country: obs.location.country,
            latitude: obs.location.latitude,
            longitude: obs.location.longitude,
            predicted_power: result.predicted_power,
            unit: "W".to_string(),
            timestamp: result.timestamp.to_rfc3339(),
            quality: result.quality,
        },
        weather: result.weather,
        solar_parameters: SolarParameters {
            poa_direct: round2(result.solar.poa_direct),
            poa_sky_diffuse: round2(result.solar.poa_sky_diffuse),
            poa_ground_diffuse: round2(result.solar.poa_ground_diffuse),
            solar_elevation: result.solar.solar_elevation,
        },
    }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Maximum number of records (defaults to the configured history limit)
    pub limit: Option<usize>,
}

/// GET /api/history
/// Recent predictions, newest first
#[utoipa::path(
    get,
    path = "/api/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Recent predictions", body = HistoryResponse),
        (status = 400, description = "Malformed query string", body = ErrorBody),
        (status = 500, description = "Database failure", body = ErrorBody)
    )
)]
pub async fn get_prediction_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Query(query) = query
        .map_err(|rejection| ApiError::new(StatusCode::BAD_REQUEST, "Invalid request", rejection.body_text()))?;
    let limit = query.limit.unwrap_or(state.config.database.history_limit);
    let store = state.store.clone();

    let predictions = tokio::task::spawn_blocking(move || store.recent(limit))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(|e| {
            error!("History retrieval error: {}", e);
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve history", e.to_string())
        })?;

    Ok(Json(HistoryResponse {
        success: true,
        count: predictions.len(),
        predictions,
    }))
}

/// GET /health
/// Service health and model/registry status
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthStatus)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        service: "SolarEnergyPredictor".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        registry_size: state.predictor.registry().len(),
        fallback_available: state.predictor.has_fallback(),
    })
}

pub async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not found", "The requested resource was not found")
}
