pub mod column_registry;
pub mod feature_vector;
pub mod history_store;
pub mod predictor;
pub mod regression;
pub mod solar_algorithm;
pub mod weather_service;
