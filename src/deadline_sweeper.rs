use color_eyre::eyre::Result;
use dotenv::dotenv;

use caresync_api::config::ApiConfig;
use caresync_api::sweep::run_deadline_sweeper;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = ApiConfig::from_env()?;

    // Create database connection pool
    let db_pool = caresync_db::create_pool(&config.database_url).await?;

    println!(
        "Running deadline sweeper every {} second(s)...",
        config.sweep_interval_seconds
    );
    run_deadline_sweeper(db_pool, config.sweep_interval()).await;

    Ok(())
}
