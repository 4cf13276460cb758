pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod profile;
pub mod services;
pub mod state;
pub mod units;

pub use error::AppError;
pub use units::WeightUnit;
