use utoipa::OpenApi;
use crate::controllers::prediction_controller;
use crate::models::{prediction, weather};

#[derive(OpenApi)]
#[openapi(
    paths(
        prediction_controller::predict_solar_power,
        prediction_controller::get_prediction_history,
        prediction_controller::health
    ),
    components(
        schemas(
            prediction::PredictRequest,
            prediction::PredictResponse,
            prediction::PredictionSummary,
            prediction::PredictionQuality,
            prediction::DegradedReason,
            prediction::SolarParameters,
            prediction::PredictionRecord,
            prediction::HistoryResponse,
            prediction::HealthStatus,
            prediction::ErrorBody,
            weather::WeatherSnapshot
        )
    ),
    tags(
        (name = "solar-energy-predictor", description = "Solar power prediction API")
    )
)]
pub struct ApiDoc;
