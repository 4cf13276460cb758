pub mod prescriptions;
pub mod sessions;

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::config::Config;
use crate::error::AppError;

pub async fn connect(config: &Config) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    info!("connected to {}", config.database_url);
    Ok(pool)
}

pub async fn migrate(db: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(db).await?;
    Ok(())
}

pub async fn ping(db: &SqlitePool) -> Result<(), AppError> {
    sqlx::query("select 1").execute(db).await?;
    Ok(())
}
