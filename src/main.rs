mod routes;
mod controllers;
mod services;
mod models;
mod api_docs;
mod shared_state;
mod config;

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::{Config, WEATHER_KEY_ENV};
use crate::routes::prediction_routes::app;
use crate::services::column_registry::ColumnRegistry;
use crate::services::history_store::PredictionStore;
use crate::services::predictor::Predictor;
use crate::services::regression::{FallbackEstimator, PredictionEngine};
use crate::services::weather_service::WeatherService;
use crate::shared_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("solar_energy_predictor=info,tower_http=info")),
        )
        .init();

    // 1. Load configuration
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = Config::load(&config_path)?;
    info!("Configuration loaded from {}", config_path);

    // 2. Column registry and models, loaded once and shared read-only
    let registry = ColumnRegistry::load(&config.model.column_names_path)
        .with_baseline(config.model.baseline_location.clone());

    let engine = PredictionEngine::from_artifact(&config.model.path)
        .with_context(|| format!("cannot serve without the model at {}", config.model.path))?;

    let fallback = match &config.model.fallback_path {
        Some(path) => match FallbackEstimator::from_artifact(path) {
            Ok(f) => {
                info!("Fallback estimator loaded from {}", path);
                Some(f)
            }
            Err(e) => {
                warn!("Fallback estimator unavailable: {}", e);
                None
            }
        },
        None => None,
    };

    let predictor = Predictor::new(registry, engine, fallback);
    debug!("Registered locations: {:?}", predictor.registry().names());

    // 3. Collaborators
    let weather = WeatherService::new(&config.weather)?;
    if !weather.has_api_key() {
        warn!("No weather API key configured (set {}), predictions will fail", WEATHER_KEY_ENV);
    }
    let store = PredictionStore::open(&config.database.path)?;

    // 4. Start Axum HTTP server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;

    let state = AppState::new(config, predictor, weather, store);
    let router = app(state);

    info!("API Server listening on http://{}", addr);
    info!("Scalar UI: http://{}/scalar", addr);

    axum_server::bind(addr)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}
