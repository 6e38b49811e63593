use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::weather::{ResolvedLocation, WeatherSnapshot};

// ─── Solar geometry output ───────────────────────────────────────────────────

/// Plane-of-array irradiance components and sun position for one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SolarParameters {
    /// Beam irradiance on the panel plane (W/m²)
    pub poa_direct: f64,
    /// Sky diffuse irradiance on the panel plane (W/m²)
    pub poa_sky_diffuse: f64,
    /// Ground-reflected irradiance on the panel plane (W/m²)
    pub poa_ground_diffuse: f64,
    /// Sun elevation above the horizon (deg)
    pub solar_elevation: f64,
}

// ─── Model inputs ────────────────────────────────────────────────────────────

/// Column names of the numeric tail, in trained-model order.
pub const NUMERIC_FEATURE_NAMES: [&str; 6] = [
    "time_stamp",
    "poa_direct",
    "poa_sky_diffuse",
    "solar_elevation",
    "wind_speed",
    "temp_air",
];

/// The six numeric inputs of one prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationBundle {
    pub time_stamp: f64,
    pub poa_direct: f64,
    pub poa_sky_diffuse: f64,
    pub solar_elevation: f64,
    pub wind_speed: f64,
    pub temp_air: f64,
}

impl ObservationBundle {
    /// Values laid out as in [`NUMERIC_FEATURE_NAMES`].
    pub fn ordered(&self) -> [f64; 6] {
        [
            self.time_stamp,
            self.poa_direct,
            self.poa_sky_diffuse,
            self.solar_elevation,
            self.wind_speed,
            self.temp_air,
        ]
    }
}

// ─── Prediction outcome ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    /// No column registry loaded; location one-hot region zeroed
    RegistryUnavailable,
    /// Location missing from the registry; location one-hot region zeroed
    LocationNotInRegistry,
    /// Primary model failed; six-feature estimator used instead
    FallbackEstimator,
    /// Primary model and fallback both unavailable; power is a 0.0 placeholder
    Placeholder,
}

impl DegradedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradedReason::RegistryUnavailable => "registry_unavailable",
            DegradedReason::LocationNotInRegistry => "location_not_in_registry",
            DegradedReason::FallbackEstimator => "fallback_estimator",
            DegradedReason::Placeholder => "placeholder",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registry_unavailable" => Some(DegradedReason::RegistryUnavailable),
            "location_not_in_registry" => Some(DegradedReason::LocationNotInRegistry),
            "fallback_estimator" => Some(DegradedReason::FallbackEstimator),
            "placeholder" => Some(DegradedReason::Placeholder),
            _ => None,
        }
    }
}

/// Whether a prediction ran at full fidelity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionQuality {
    Full,
    Degraded { reasons: Vec<DegradedReason> },
}

impl PredictionQuality {
    pub fn from_reasons(reasons: Vec<DegradedReason>) -> Self {
        if reasons.is_empty() {
            PredictionQuality::Full
        } else {
            PredictionQuality::Degraded { reasons }
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, PredictionQuality::Degraded { .. })
    }

    pub fn reasons(&self) -> &[DegradedReason] {
        match self {
            PredictionQuality::Full => &[],
            PredictionQuality::Degraded { reasons } => reasons,
        }
    }

    /// Compact form used for persistence: `full` or `degraded:a,b`.
    pub fn to_tag(&self) -> String {
        match self {
            PredictionQuality::Full => "full".to_string(),
            PredictionQuality::Degraded { reasons } => {
                let joined: Vec<&str> = reasons.iter().map(|r| r.as_str()).collect();
                format!("degraded:{}", joined.join(","))
            }
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag.strip_prefix("degraded:") {
            Some(list) => PredictionQuality::from_reasons(
                list.split(',').filter_map(DegradedReason::parse).collect(),
            ),
            None => PredictionQuality::Full,
        }
    }
}

/// Output of the prediction pipeline together with the inputs that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// Predicted power (W), non-negative, rounded to 2 decimals
    pub predicted_power: f64,
    pub quality: PredictionQuality,
    pub location: String,
    pub weather: WeatherSnapshot,
    pub solar: SolarParameters,
    pub timestamp: DateTime<FixedOffset>,
}

// ─── Persistence ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PredictionRecord {
    pub id: i64,
    pub timestamp: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub poa_direct: f64,
    pub poa_sky_diffuse: f64,
    pub poa_ground_diffuse: f64,
    pub solar_elevation: f64,
    pub wind_speed: f64,
    pub temp_air: f64,
    pub predicted_power: f64,
    pub quality: PredictionQuality,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPredictionRecord {
    pub timestamp: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub solar: SolarParameters,
    pub wind_speed: f64,
    pub temp_air: f64,
    pub predicted_power: f64,
    pub quality: PredictionQuality,
}

impl NewPredictionRecord {
    pub fn from_result(result: &PredictionResult, location: &ResolvedLocation) -> Self {
        Self {
            timestamp: result.timestamp.to_rfc3339(),
            city: location.city.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            solar: result.solar,
            wind_speed: result.weather.wind_speed,
            temp_air: result.weather.temperature,
            predicted_power: result.predicted_power,
            quality: result.quality.clone(),
        }
    }
}

// ─── REST API types ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct PredictRequest {
    pub city: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PredictResponse {
    pub success: bool,
    pub prediction: PredictionSummary,
    pub weather: WeatherSnapshot,
    pub solar_parameters: SolarParameters,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PredictionSummary {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub predicted_power: f64,
    pub unit: String,
    pub timestamp: String,
    pub quality: PredictionQuality,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub success: bool,
    pub count: usize,
    pub predictions: Vec<PredictionRecord>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub registry_size: usize,
    pub fallback_available: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
