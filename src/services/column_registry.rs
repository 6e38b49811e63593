use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use crate::services::feature_vector::LOCATION_SLOTS;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("duplicate location column: {0}")]
    Duplicate(String),
}

/// Ordered location columns of the trained model.
///
/// Position in the list is the one-hot index. An empty registry is a valid
/// state: every location then encodes to an all-zero region.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    names: Vec<String>,
    index: HashMap<String, usize>,
    baseline: Option<String>,
}

impl ColumnRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a registry from column names. Only the first `LOCATION_SLOTS`
    /// entries are location columns; the rest of a full column list is ignored.
    pub fn from_names<I, S>(names: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names
            .into_iter()
            .take(LOCATION_SLOTS)
            .map(Into::into)
            .collect();

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(RegistryError::Duplicate(name.clone()));
            }
        }

        Ok(Self {
            names,
            index,
            baseline: None,
        })
    }

    /// Sets the reference category dropped at training time. It has no
    /// column of its own and encodes as an all-zero location region.
    pub fn with_baseline(mut self, baseline: Option<String>) -> Self {
        self.baseline = baseline.filter(|b| !b.is_empty());
        self
    }

    pub fn is_baseline(&self, name: &str) -> bool {
        self.baseline.as_deref() == Some(name)
    }

    /// Reads a JSON array of column names. Never fails: a missing or
    /// malformed file yields an empty registry.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                info!(
                    "Column registry not available at {} ({}), location encoding disabled",
                    path.display(),
                    e
                );
                return Self::empty();
            }
        };

        let names: Vec<String> = match serde_json::from_str(&content) {
            Ok(n) => n,
            Err(e) => {
                warn!(
                    "Column registry at {} is malformed ({}), location encoding disabled",
                    path.display(),
                    e
                );
                return Self::empty();
            }
        };

        match Self::from_names(names) {
            Ok(registry) => {
                info!(
                    "Column registry loaded from {}: {} locations",
                    path.display(),
                    registry.len()
                );
                registry
            }
            Err(e) => {
                warn!(
                    "Column registry at {} rejected ({}), location encoding disabled",
                    path.display(),
                    e
                );
                Self::empty()
            }
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_index_of_is_exact_and_case_sensitive() {
        let r = ColumnRegistry::from_names(["Berlin", "London", "Paris"]).unwrap();
        assert_eq!(r.index_of("London"), Some(1));
        assert_eq!(r.index_of("london"), None);
        assert_eq!(r.index_of("London "), None);
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn test_baseline_location() {
        let r = ColumnRegistry::from_names(["Berlin"])
            .unwrap()
            .with_baseline(Some("Afzalpur".to_string()));
        assert!(r.is_baseline("Afzalpur"));
        assert!(!r.is_baseline("Berlin"));
        assert_eq!(r.index_of("Afzalpur"), None);

        let r = ColumnRegistry::empty().with_baseline(Some(String::new()));
        assert!(!r.is_baseline(""));
    }

    #[test]
    fn test_duplicates_rejected() {
        let err = ColumnRegistry::from_names(["A", "B", "A"]).unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("A".to_string()));
    }

    #[test]
    fn test_full_column_list_keeps_location_slots_only() {
        let mut names: Vec<String> = (0..LOCATION_SLOTS).map(|i| format!("loc_{i}")).collect();
        names.extend(["time_stamp", "poa_direct", "poa_sky_diffuse", "solar_elevation", "wind_speed", "temp_air"].map(String::from));
        let r = ColumnRegistry::from_names(names).unwrap();
        assert_eq!(r.len(), LOCATION_SLOTS);
        assert_eq!(r.index_of("loc_239"), Some(239));
        assert_eq!(r.index_of("temp_air"), None);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let r = ColumnRegistry::load(dir.path().join("column_names.json"));
        assert!(r.is_empty());
    }

    #[test]
    fn test_load_malformed_file_is_empty() {
        let f = write_temp("{\"not\": \"a list\"}");
        assert!(ColumnRegistry::load(f.path()).is_empty());

        let f = write_temp("[\"London\", 5]");
        assert!(ColumnRegistry::load(f.path()).is_empty());
    }

    #[test]
    fn test_load_duplicate_file_is_empty() {
        let f = write_temp("[\"London\", \"London\"]");
        assert!(ColumnRegistry::load(f.path()).is_empty());
    }

    #[test]
    fn test_load_valid_file() {
        let f = write_temp("[\"Berlin\", \"London\"]");
        let r = ColumnRegistry::load(f.path());
        assert_eq!(r.names(), &["Berlin".to_string(), "London".to_string()]);
        assert_eq!(r.index_of("Berlin"), Some(0));
    }
}
