use anyhow::Result;
use tokio::io::BufReader;
use tokio::signal;
use tracing::{error, info};

use setkeeper::config::Config;
use setkeeper::init::setup_logging;
use setkeeper::plugin::Registry;
use setkeeper::query::serve_queries;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Config
    let config_path = std::env::args().nth(1).unwrap_or("config.toml".to_string());
    let config_exists = std::path::Path::new(&config_path).exists();
    let config = if config_exists {
        Config::load(&config_path).await?
    } else {
        Config::default()
    };

    // 2. Setup Logging
    setup_logging(&config);
    info!("Starting setkeeper...");

    if !config_exists {
        info!("Config file not found, using defaults.");
    }

    // 3. Build Sets (initial downloads complete here)
    let registry = Registry::from_config(&config).await?;

    // 4. Answer queries from stdin
    let input = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let res = tokio::select! {
        res = serve_queries(&registry, input, &mut stdout) => res,
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received.");
            Ok(())
        }
    };
    if let Err(e) = &res {
        error!("Query loop failed: {:#}", e);
    }

    // 5. Graceful Shutdown
    registry.shutdown().await;
    res
}
