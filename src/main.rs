use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trainbook::config::Config;
use trainbook::db;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = db::connect(&config).await?;
    db::migrate(&pool).await?;
    db::ping(&pool).await?;

    info!("database ready at {}", config.database_url);
    Ok(())
}
