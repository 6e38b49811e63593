use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::services::feature_vector::{FEATURE_WIDTH, FeatureVector, NUMERIC_FEATURES};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse model artifact {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("model artifact declares {declared} inputs but has {coefficients} coefficients")]
    Inconsistent { declared: usize, coefficients: usize },

    #[error("model expects {expected} inputs, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("model produced a non-finite output")]
    NonFiniteOutput,
}

/// A trained single-output regression model.
pub trait Regressor: Send + Sync + std::fmt::Debug {
    /// Number of inputs the model was trained on.
    fn input_width(&self) -> usize;

    /// Runs inference on one row.
    fn predict(&self, row: &[f64]) -> Result<f64, ModelError>;
}

/// Linear regression exported as JSON:
/// `{ "n_features_in": 246, "coef": [..], "intercept": 0.0 }`
#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    n_features_in: usize,
    coef: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    #[cfg(test)]
    pub fn new(coef: Vec<f64>, intercept: f64) -> Self {
        Self {
            n_features_in: coef.len(),
            coef,
            intercept,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ModelError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let model: LinearModel =
            serde_json::from_str(&content).map_err(|source| ModelError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        if model.coef.len() != model.n_features_in {
            return Err(ModelError::Inconsistent {
                declared: model.n_features_in,
                coefficients: model.coef.len(),
            });
        }
        Ok(model)
    }
}

impl Regressor for LinearModel {
    fn input_width(&self) -> usize {
        self.n_features_in
    }

    fn predict(&self, row: &[f64]) -> Result<f64, ModelError> {
        if row.len() != self.coef.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.coef.len(),
                actual: row.len(),
            });
        }
        let dot: f64 = self.coef.iter().zip(row).map(|(c, x)| c * x).sum();
        Ok(dot + self.intercept)
    }
}

/// Power cannot be negative; anything at or below zero becomes exactly 0.0.
pub fn clamp_non_negative(raw: f64) -> f64 {
    if raw > 0.0 { raw } else { 0.0 }
}

/// The trained model behind the prediction pipeline.
///
/// Refuses to construct unless the model takes exactly `FEATURE_WIDTH`
/// inputs, so a mismatched artifact stops the service at start-up.
#[derive(Debug)]
pub struct PredictionEngine {
    model: Box<dyn Regressor>,
}

impl PredictionEngine {
    pub fn new(model: Box<dyn Regressor>) -> Result<Self, ModelError> {
        let width = model.input_width();
        if width != FEATURE_WIDTH {
            return Err(ModelError::DimensionMismatch {
                expected: FEATURE_WIDTH,
                actual: width,
            });
        }
        Ok(Self { model })
    }

    pub fn from_artifact(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let engine = Self::new(Box::new(LinearModel::load(path)?))?;
        info!("Model loaded from {} ({} inputs)", path.display(), FEATURE_WIDTH);
        Ok(engine)
    }

    /// Predicted power (W), never negative.
    pub fn predict(&self, vector: &FeatureVector) -> Result<f64, ModelError> {
        let raw = self.model.predict(vector.as_slice())?;
        if !raw.is_finite() {
            return Err(ModelError::NonFiniteOutput);
        }
        Ok(clamp_non_negative(raw))
    }
}

/// Estimator over the six numeric features only, used when the primary
/// model fails at call time.
#[derive(Debug)]
pub struct FallbackEstimator {
    model: Box<dyn Regressor>,
}

impl FallbackEstimator {
    pub fn new(model: Box<dyn Regressor>) -> Result<Self, ModelError> {
        let width = model.input_width();
        if width != NUMERIC_FEATURES {
            return Err(ModelError::DimensionMismatch {
                expected: NUMERIC_FEATURES,
                actual: width,
            });
        }
        Ok(Self { model })
    }

    pub fn from_artifact(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        Self::new(Box::new(LinearModel::load(path)?))
    }

    pub fn predict(&self, numeric: &[f64]) -> Result<f64, ModelError> {
        let raw = self.model.predict(numeric)?;
        if !raw.is_finite() {
            return Err(ModelError::NonFiniteOutput);
        }
        Ok(clamp_non_negative(raw))
    }
}
