use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ─── Resolved location / observation ─────────────────────────────────────────

/// City resolved by the weather provider's geocoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedLocation {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Shift from UTC in seconds at the location
    pub utc_offset_seconds: i32,
}

/// Current conditions at a resolved location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeatherSnapshot {
    /// Air temperature (°C)
    pub temperature: f64,
    /// Wind speed (m/s)
    pub wind_speed: f64,
    /// Cloud cover (%)
    pub clouds: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherObservation {
    pub location: ResolvedLocation,
    pub snapshot: WeatherSnapshot,
}

// ─── OpenWeatherMap wire types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CurrentWeatherResponse {
    pub name: Option<String>,
    pub coord: Option<Coord>,
    pub sys: Option<Sys>,
    pub main: Option<MainBlock>,
    pub wind: Option<Wind>,
    pub clouds: Option<Clouds>,
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct Sys {
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MainBlock {
    pub temp: f64,
    pub humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Wind {
    pub speed: f64,
}

#[derive(Debug, Deserialize)]
pub struct Clouds {
    pub all: f64,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    pub description: String,
}
