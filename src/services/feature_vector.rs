/// ============================================================
///  Feature vector layout of the trained model
///
///   [0 .. 240)   one-hot location indicator (at most one 1.0)
///   [240 .. 246) time_stamp, poa_direct, poa_sky_diffuse,
///                solar_elevation, wind_speed, temp_air
///
///  The layout is a fixed contract of the model artifact. A
///  different order still "works" and silently produces wrong
///  predictions, so it is pinned by the golden-vector test below.
/// ============================================================

use crate::models::prediction::{DegradedReason, ObservationBundle};
use crate::services::column_registry::ColumnRegistry;

pub const LOCATION_SLOTS: usize = 240;
pub const NUMERIC_FEATURES: usize = 6;
pub const FEATURE_WIDTH: usize = LOCATION_SLOTS + NUMERIC_FEATURES;

/// How the location region of a vector was filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationEncoding {
    OneHot(usize),
    /// Reference category of the model; all-zero by construction
    Baseline,
    RegistryEmpty,
    NotInRegistry,
}

impl LocationEncoding {
    pub fn degraded_reason(&self) -> Option<DegradedReason> {
        match self {
            LocationEncoding::OneHot(_) | LocationEncoding::Baseline => None,
            LocationEncoding::RegistryEmpty => Some(DegradedReason::RegistryUnavailable),
            LocationEncoding::NotInRegistry => Some(DegradedReason::LocationNotInRegistry),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_WIDTH],
    encoding: LocationEncoding,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[cfg(test)]
    pub fn location_region(&self) -> &[f64] {
        &self.values[..LOCATION_SLOTS]
    }

    pub fn numeric_region(&self) -> &[f64] {
        &self.values[LOCATION_SLOTS..]
    }

    pub fn encoding(&self) -> LocationEncoding {
        self.encoding
    }
}

/// Builds the model input for one location and observation.
///
/// Never fails. Unknown locations and an empty registry leave the location
/// region zeroed; non-finite numbers are copied as-is.
pub fn build(location: &str, bundle: &ObservationBundle, registry: &ColumnRegistry) -> FeatureVector {
    let mut values = [0.0; FEATURE_WIDTH];

    let encoding = if registry.is_empty() {
        LocationEncoding::RegistryEmpty
    } else if let Some(i) = registry.index_of(location) {
        values[i] = 1.0;
        LocationEncoding::OneHot(i)
    } else if registry.is_baseline(location) {
        LocationEncoding::Baseline
    } else {
        LocationEncoding::NotInRegistry
    };

    values[LOCATION_SLOTS..].copy_from_slice(&bundle.ordered());

    FeatureVector { values, encoding }
}
