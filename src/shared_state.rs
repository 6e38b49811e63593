use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::services::history_store::PredictionStore;
use crate::services::predictor::Predictor;
use crate::services::weather_service::WeatherService;

/// Process-wide state, built once in `main` and cloned into every handler.
/// Nothing in here is mutated per request except the store behind its lock.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub predictor: Arc<Predictor>,
    pub weather: Arc<WeatherService>,
    pub store: Arc<PredictionStore>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: Config,
        predictor: Predictor,
        weather: WeatherService,
        store: PredictionStore,
    ) -> Self {
        Self {
            config: Arc::new(config),
            predictor: Arc::new(predictor),
            weather: Arc::new(weather),
            store: Arc::new(store),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
