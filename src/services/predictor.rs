use chrono::{DateTime, FixedOffset, Timelike};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::prediction::{
    DegradedReason, NUMERIC_FEATURE_NAMES, ObservationBundle, PredictionQuality, PredictionResult,
    SolarParameters,
};
use crate::models::weather::WeatherSnapshot;
use crate::services::column_registry::ColumnRegistry;
use crate::services::feature_vector;
use crate::services::regression::{FallbackEstimator, PredictionEngine, clamp_non_negative};

#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    #[error("location name cannot be empty")]
    EmptyLocation,

    #[error("input {field} is not a finite number")]
    NonFiniteInput { field: &'static str },
}

/// Trims the name and rejects it when nothing is left.
pub fn validate_location(name: &str) -> Result<&str, PredictError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(PredictError::EmptyLocation)
    } else {
        Ok(trimmed)
    }
}

/// Hour of day at the location, as the model was trained on.
pub fn time_feature(timestamp: &DateTime<FixedOffset>) -> f64 {
    f64::from(timestamp.hour())
}

/// 2^52. Magnitudes from here up have no fractional part.
const EXACT_INTEGER_BOUND: f64 = 4_503_599_627_370_496.0;

pub fn round2(x: f64) -> f64 {
    if x.abs() >= EXACT_INTEGER_BOUND {
        return x;
    }
    (x * 100.0).round() / 100.0
}

/// Runs the prediction pipeline over the shared registry and models.
///
/// Everything here is read-only after construction, so one instance serves
/// all requests concurrently.
#[derive(Debug)]
pub struct Predictor {
    registry: ColumnRegistry,
    engine: PredictionEngine,
    fallback: Option<FallbackEstimator>,
}

impl Predictor {
    pub fn new(
        registry: ColumnRegistry,
        engine: PredictionEngine,
        fallback: Option<FallbackEstimator>,
    ) -> Self {
        Self {
            registry,
            engine,
            fallback,
        }
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn predict_for_location(
        &self,
        location_name: &str,
        weather: &WeatherSnapshot,
        solar: &SolarParameters,
        timestamp: DateTime<FixedOffset>,
    ) -> Result<PredictionResult, PredictError> {
        // 1. Validate
        let location = validate_location(location_name)?;

        // 2. Assemble numeric inputs
        let bundle = ObservationBundle {
            time_stamp: time_feature(&timestamp),
            poa_direct: solar.poa_direct,
            poa_sky_diffuse: solar.poa_sky_diffuse,
            solar_elevation: solar.solar_elevation,
            wind_speed: weather.wind_speed,
            temp_air: weather.temperature,
        };
        for (field, value) in NUMERIC_FEATURE_NAMES.into_iter().zip(bundle.ordered()) {
            if !value.is_finite() {
                return Err(PredictError::NonFiniteInput { field });
            }
        }

        // 3. Build
        let vector = feature_vector::build(location, &bundle, &self.registry);
        let mut reasons: Vec<DegradedReason> =
            vector.encoding().degraded_reason().into_iter().collect();

        #[cfg(feature = "verbose_log")]
        debug!("Feature vector for {}: {:?}", location, vector.as_slice());

        // 4. Infer, 5. fall back
        let power = match self.engine.predict(&vector) {
            Ok(p) => p,
            Err(e) => {
                warn!("Model inference failed for {}: {}", location, e);
                self.fallback_power(vector.numeric_region(), &mut reasons)
            }
        };

        // 6. Shape
        let predicted_power = round2(clamp_non_negative(power));
        debug!(
            "Prediction for {}: {:.2} W ({:?})",
            location, predicted_power, reasons
        );

        Ok(PredictionResult {
            predicted_power,
            quality: PredictionQuality::from_reasons(reasons),
            location: location.to_string(),
            weather: weather.clone(),
            solar: *solar,
            timestamp,
        })
    }

    fn fallback_power(&self, numeric: &[f64], reasons: &mut Vec<DegradedReason>) -> f64 {
        let Some(fallback) = &self.fallback else {
            reasons.push(DegradedReason::Placeholder);
            return 0.0;
        };

        match fallback.predict(numeric) {
            Ok(p) => {
                reasons.push(DegradedReason::FallbackEstimator);
                p
            }
            Err(e) => {
                warn!("Fallback estimator failed: {}", e);
                reasons.push(DegradedReason::Placeholder);
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::feature_vector::{FEATURE_WIDTH, NUMERIC_FEATURES};
    use crate::services::regression::tests::{BrokenModel, ConstantModel};
    use crate::services::regression::{LinearModel, ModelError, Regressor};
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct CountingModel {
        calls: Arc<AtomicUsize>,
    }

    impl Regressor for CountingModel {
        fn input_width(&self) -> usize {
            FEATURE_WIDTH
        }

        fn predict(&self, _row: &[f64]) -> Result<f64, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(1.0)
        }
    }

    fn weather() -> WeatherSnapshot {
        WeatherSnapshot {
            temperature: 18.5,
            wind_speed: 3.2,
            clouds: 40.0,
            humidity: 65.0,
            description: "scattered clouds".to_string(),
        }
    }

    fn solar() -> SolarParameters {
        SolarParameters {
            poa_direct: 480.0,
            poa_sky_diffuse: 112.5,
            poa_ground_diffuse: 20.0,
            solar_elevation: 45.0,
        }
    }

    fn at_ten_local() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2025, 6, 21, 10, 0, 0)
            .unwrap()
    }

    fn registry() -> ColumnRegistry {
        ColumnRegistry::from_names(["Amsterdam", "Athens", "Berlin", "Dublin", "Lisbon", "London"]).unwrap()
    }

    fn constant(output: f64) -> PredictionEngine {
        PredictionEngine::new(Box::new(ConstantModel { width: FEATURE_WIDTH, output })).unwrap()
    }

    #[test]
    fn test_negative_raw_output_is_zero() {
        let p = Predictor::new(registry(), constant(-42.7), None);
        let r = p.predict_for_location("London", &weather(), &solar(), at_ten_local()).unwrap();
        assert_eq!(r.predicted_power, 0.0);
        assert_eq!(r.quality, PredictionQuality::Full);
    }

    #[test]
    fn test_output_rounded_to_two_decimals() {
        let p = Predictor::new(registry(), constant(756.423), None);
        let r = p.predict_for_location("London", &weather(), &solar(), at_ten_local()).unwrap();
        assert_eq!(r.predicted_power, 756.42);
    }

    #[test]
    fn test_empty_location_rejected_before_inference() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = PredictionEngine::new(Box::new(CountingModel { calls: calls.clone() })).unwrap();
        let p = Predictor::new(registry(), engine, None);

        for name in ["", "   "] {
            let err = p.predict_for_location(name, &weather(), &solar(), at_ten_local()).unwrap_err();
            assert_eq!(err, PredictError::EmptyLocation);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        p.predict_for_location("London", &weather(), &solar(), at_ten_local()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_identical_calls_identical_output() {
        let coef: Vec<f64> = (0..FEATURE_WIDTH).map(|i| 0.5 + i as f64 / 100.0).collect();
        let engine = PredictionEngine::new(Box::new(LinearModel::new(coef, -3.0))).unwrap();
        let p = Predictor::new(registry(), engine, None);

        let a = p.predict_for_location("London", &weather(), &solar(), at_ten_local()).unwrap();
        let b = p.predict_for_location("London", &weather(), &solar(), at_ten_local()).unwrap();
        assert_eq!(a.predicted_power, b.predicted_power);
        assert_eq!(a, b);
    }

    #[test]
    fn test_uses_local_hour_and_echoes_inputs() {
        // Weights pick out the time_stamp slot only.
        let mut coef = vec![0.0; FEATURE_WIDTH];
        coef[240] = 1.0;
        let engine = PredictionEngine::new(Box::new(LinearModel::new(coef, 0.0))).unwrap();
        let p = Predictor::new(registry(), engine, None);

        let r = p.predict_for_location("  London ", &weather(), &solar(), at_ten_local()).unwrap();
        assert_eq!(r.predicted_power, 10.0);
        assert_eq!(r.location, "London");
        assert_eq!(r.weather, weather());
        assert_eq!(r.solar, solar());
        assert_eq!(r.timestamp, at_ten_local());
    }

    #[test]
    fn test_registry_degradations_are_reported() {
        let p = Predictor::new(registry(), constant(100.0), None);
        let r = p.predict_for_location("Paris", &weather(), &solar(), at_ten_local()).unwrap();
        assert_eq!(r.predicted_power, 100.0);
        assert_eq!(r.quality.reasons(), &[DegradedReason::LocationNotInRegistry]);

        let p = Predictor::new(ColumnRegistry::empty(), constant(100.0), None);
        let r = p.predict_for_location("Paris", &weather(), &solar(), at_ten_local()).unwrap();
        assert_eq!(r.quality.reasons(), &[DegradedReason::RegistryUnavailable]);
    }

    #[test]
    fn test_inference_failure_uses_fallback_estimator() {
        let engine = PredictionEngine::new(Box::new(BrokenModel)).unwrap();
        // 10 + 480 + 112.5 + 45 + 3.2 + 18.5
        let fallback = FallbackEstimator::new(Box::new(LinearModel::new(vec![1.0; NUMERIC_FEATURES], 0.0))).unwrap();
        let p = Predictor::new(registry(), engine, Some(fallback));

        let r = p.predict_for_location("London", &weather(), &solar(), at_ten_local()).unwrap();
        assert_eq!(r.predicted_power, 669.2);
        assert!(r.quality.is_degraded());
        assert_eq!(r.quality.reasons(), &[DegradedReason::FallbackEstimator]);
    }

    #[test]
    fn test_inference_failure_without_fallback_is_placeholder() {
        let engine = PredictionEngine::new(Box::new(BrokenModel)).unwrap();
        let p = Predictor::new(ColumnRegistry::empty(), engine, None);

        let r = p.predict_for_location("London", &weather(), &solar(), at_ten_local()).unwrap();
        assert_eq!(r.predicted_power, 0.0);
        assert_eq!(
            r.quality.reasons(),
            &[DegradedReason::RegistryUnavailable, DegradedReason::Placeholder]
        );
    }

    #[test]
    fn test_failing_fallback_is_placeholder() {
        let engine = PredictionEngine::new(Box::new(BrokenModel)).unwrap();
        let fallback = FallbackEstimator::new(Box::new(ConstantModel { width: NUMERIC_FEATURES, output: f64::NAN })).unwrap();
        let p = Predictor::new(registry(), engine, Some(fallback));

        let r = p.predict_for_location("London", &weather(), &solar(), at_ten_local()).unwrap();
        assert_eq!(r.predicted_power, 0.0);
        assert_eq!(r.quality.reasons(), &[DegradedReason::Placeholder]);
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let p = Predictor::new(registry(), constant(1.0), None);
        let mut w = weather();
        w.wind_speed = f64::NAN;
        let err = p.predict_for_location("London", &w, &solar(), at_ten_local()).unwrap_err();
        assert_eq!(err, PredictError::NonFiniteInput { field: "wind_speed" });
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(756.423), 756.42);
        assert_eq!(round2(756.425_1), 756.43);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(1.0e307), 1.0e307);
        assert_eq!(round2(f64::MAX), f64::MAX);
        assert_eq!(round2(-1.0e307), -1.0e307);
    }

    #[test]
    fn test_huge_finite_output_stays_finite() {
        let p = Predictor::new(registry(), constant(1.0e307), None);
        let r = p.predict_for_location("London", &weather(), &solar(), at_ten_local()).unwrap();
        assert!(r.predicted_power.is_finite());
        assert_eq!(r.predicted_power, 1.0e307);
        assert_eq!(r.quality, PredictionQuality::Full);
    }
}
