use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, params};
use thiserror::Error;
use tracing::info;

use crate::models::prediction::{NewPredictionRecord, PredictionQuality, PredictionRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create database directory {path}: {source}")]
    Directory {
        path: String,
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database connection lock poisoned")]
    Poisoned,
}

/// SQLite history of served predictions.
#[derive(Debug)]
pub struct PredictionStore {
    conn: Mutex<Connection>,
}

impl PredictionStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Directory {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let store = Self::with_connection(Connection::open(path)?)?;
        info!(
            "Database initialized at {} ({} predictions stored)",
            path,
            store.count()?
        );
        Ok(store)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS predictions (
                id                 INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp          TEXT NOT NULL,
                city               TEXT NOT NULL,
                latitude           REAL NOT NULL,
                longitude          REAL NOT NULL,
                poa_direct         REAL NOT NULL,
                poa_sky_diffuse    REAL NOT NULL,
                poa_ground_diffuse REAL NOT NULL,
                solar_elevation    REAL NOT NULL,
                wind_speed         REAL NOT NULL,
                temp_air           REAL NOT NULL,
                predicted_power    REAL NOT NULL,
                quality            TEXT NOT NULL DEFAULT 'full'
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Stores one prediction and returns its row id.
    pub fn insert(&self, record: &NewPredictionRecord) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO predictions (
                timestamp, city, latitude, longitude,
                poa_direct, poa_sky_diffuse, poa_ground_diffuse,
                solar_elevation, wind_speed, temp_air, predicted_power, quality
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.timestamp,
                record.city,
                record.latitude,
                record.longitude,
                record.solar.poa_direct,
                record.solar.poa_sky_diffuse,
                record.solar.poa_ground_diffuse,
                record.solar.solar_elevation,
                record.wind_speed,
                record.temp_air,
                record.predicted_power,
                record.quality.to_tag(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent predictions first.
    pub fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, city, latitude, longitude,
                    poa_direct, poa_sky_diffuse, poa_ground_diffuse,
                    solar_elevation, wind_speed, temp_air, predicted_power, quality
             FROM predictions
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row| {
            Ok(PredictionRecord {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                city: row.get(2)?,
                latitude: row.get(3)?,
                longitude: row.get(4)?,
                poa_direct: row.get(5)?,
                poa_sky_diffuse: row.get(6)?,
                poa_ground_diffuse: row.get(7)?,
                solar_elevation: row.get(8)?,
                wind_speed: row.get(9)?,
                temp_air: row.get(10)?,
                predicted_power: row.get(11)?,
                quality: PredictionQuality::from_tag(&row.get::<_, String>(12)?),
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::prediction::{DegradedReason, SolarParameters};

    fn record(city: &str, power: f64) -> NewPredictionRecord {
        NewPredictionRecord {
            timestamp: "2025-10-16T10:00:00+01:00".to_string(),
            city: city.to_string(),
            latitude: 51.5074,
            longitude: -0.1278,
            solar: SolarParameters {
                poa_direct: 800.0,
                poa_sky_diffuse: 150.0,
                poa_ground_diffuse: 50.0,
                solar_elevation: 45.0,
            },
            wind_speed: 3.2,
            temp_air: 18.5,
            predicted_power: power,
            quality: PredictionQuality::Full,
        }
    }

    #[test]
    fn test_open_creates_directory_and_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("predictions.db");
        let store = PredictionStore::open(path.to_str().unwrap()).unwrap();
        assert!(path.exists());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_insert_and_recent() {
        let store = PredictionStore::open_in_memory().unwrap();
        let first = store.insert(&record("London", 750.0)).unwrap();
        let second = store.insert(&record("Paris", 12.34)).unwrap();
        assert!(second > first);

        let rows = store.recent(5).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].city, "Paris");
        assert_eq!(rows[0].predicted_power, 12.34);
        assert_eq!(rows[1].city, "London");
        assert_eq!(rows[1].poa_ground_diffuse, 50.0);
        assert_eq!(rows[1].quality, PredictionQuality::Full);
    }

    #[test]
    fn test_degraded_quality_survives_storage() {
        let store = PredictionStore::open_in_memory().unwrap();
        let mut r = record("Paris", 0.0);
        r.quality = PredictionQuality::from_reasons(vec![
            DegradedReason::RegistryUnavailable,
            DegradedReason::Placeholder,
        ]);
        store.insert(&r).unwrap();
        assert_eq!(store.recent(1).unwrap()[0].quality, r.quality);
    }

    #[test]
    fn test_recent_respects_limit() {
        let store = PredictionStore::open_in_memory().unwrap();
        for i in 0..4 {
            store.insert(&record(&format!("City{i}"), f64::from(i))).unwrap();
        }
        let rows = store.recent(2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].city, "City3");
        assert_eq!(store.count().unwrap(), 4);
    }
}
