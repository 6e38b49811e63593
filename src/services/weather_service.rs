use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::config::WeatherConfig;
use crate::models::weather::{
    CurrentWeatherResponse, ResolvedLocation, WeatherObservation, WeatherSnapshot,
};

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather API key is not configured")]
    MissingApiKey,

    #[error("city not found: {0}")]
    CityNotFound(String),

    #[error("weather service returned {0}")]
    Status(StatusCode),

    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weather response is incomplete: missing {0}")]
    Incomplete(&'static str),
}

/// OpenWeatherMap "current weather" client. Also resolves the city name to
/// coordinates.
#[derive(Debug, Clone)]
pub struct WeatherService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherService {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_s))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Current conditions for a free-text city name.
    pub async fn get_weather_by_city(&self, city: &str) -> Result<WeatherObservation, WeatherError> {
        let Some(key) = &self.api_key else {
            return Err(WeatherError::MissingApiKey);
        };

        let url = format!("{}/weather", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("q", city), ("appid", key.as_str()), ("units", "metric")])
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(WeatherError::CityNotFound(city.to_string()));
        }
        if !status.is_success() {
            return Err(WeatherError::Status(status));
        }

        let body: CurrentWeatherResponse = resp.json().await?;
        debug!("Weather response for {}: {:?}", city, body);
        into_observation(city, body)
    }
}

fn into_observation(
    requested: &str,
    body: CurrentWeatherResponse,
) -> Result<WeatherObservation, WeatherError> {
    let Some(coord) = body.coord else {
        return Err(WeatherError::CityNotFound(requested.to_string()));
    };
    let main = body.main.ok_or(WeatherError::Incomplete("main"))?;

    let location = ResolvedLocation {
        city: body
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| requested.to_string()),
        country: body.sys.and_then(|s| s.country).unwrap_or_default(),
        latitude: coord.lat,
        longitude: coord.lon,
        utc_offset_seconds: body.timezone.unwrap_or(0),
    };

    let snapshot = WeatherSnapshot {
        temperature: main.temp,
        wind_speed: body.wind.map(|w| w.speed).unwrap_or(0.0),
        clouds: body.clouds.map(|c| c.all).unwrap_or(0.0),
        humidity: main.humidity.unwrap_or(0.0),
        description: body
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .unwrap_or_default(),
    };

    Ok(WeatherObservation { location, snapshot })
}
