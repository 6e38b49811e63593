pub mod prediction;
pub mod weather;
