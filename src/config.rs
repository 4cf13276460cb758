use std::env;

use crate::error::AppError;

const DEFAULT_DATABASE_URL: &str = "sqlite://trainbook.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOG_FILTER: &str = "trainbook=debug";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub log_filter: String,
}

impl Config {
    /// Reads configuration from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => parse_max_connections(&raw)?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        let log_filter = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            database_url,
            max_connections,
            log_filter,
        })
    }

    /// Single-connection in-memory database, used by tests.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

fn parse_max_connections(raw: &str) -> Result<u32, AppError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::InvalidField {
            field: "DATABASE_MAX_CONNECTIONS",
            reason: format!("expected a positive integer, got {raw:?}"),
        }),
    }
}
