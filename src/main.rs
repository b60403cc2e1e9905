use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use gradian::api::{start_server, ApiContext};
use gradian::producer::UnconfiguredProducer;
use gradian::{config, db};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    if let Err(e) = std::fs::create_dir_all(config::app_data_dir()) {
        tracing::error!("Cannot create data directory: {e}");
        std::process::exit(1);
    }

    let conn = match db::open_database(&config::database_path()) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Cannot open database: {e}");
            std::process::exit(1);
        }
    };

    // The extraction producer is linked in by the deployment; until then
    // extraction triggers answer 503 and the review surface works against
    // stored records.
    let ctx = ApiContext::new(
        Arc::new(Mutex::new(conn)),
        Arc::new(UnconfiguredProducer),
    );

    let port = std::env::var("GRADIAN_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(config::DEFAULT_API_PORT);

    let mut server = match start_server(ctx, port).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Cannot start API server: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    tracing::info!("Shutting down");
    server.shutdown();
    server.wait().await;
}
