//! NatureScan API Server
//!
//! Main entry point for the NatureScan backend service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use naturescan_api::{AppState, create_router};
use naturescan_core::scan::ScanConfig;
use naturescan_core::storage::{StorageConfig, StorageService};
use naturescan_core::vision::create_model;
use naturescan_db::connect;
use naturescan_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "naturescan=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    let placeholders = config.placeholder_secrets();
    if !placeholders.is_empty() {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_default();
        if run_mode == "production" {
            anyhow::bail!(
                "refusing to start in production with placeholder secrets: {}",
                placeholders.join(", ")
            );
        }
        warn!(settings = ?placeholders, "Using placeholder secrets; override them before deploying");
    }

    // Connect to database
    let db = connect(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    // Create JWT service
    let jwt_config = JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_minutes: i64::try_from(config.jwt.access_token_expiry_secs / 60)
            .unwrap_or(i64::MAX),
    };
    let jwt_service = JwtService::new(jwt_config);

    // Create storage service
    let storage_config =
        StorageConfig::from_settings(&config.storage).context("Invalid storage configuration")?;
    let storage = StorageService::from_config(storage_config)
        .context("Failed to initialize storage")?;
    info!(
        provider = storage.provider_name(),
        download_ttl_secs = storage.config().download_ttl_secs,
        "Storage configured"
    );

    // Create vision model
    let vision = create_model(&config.vision).context("Invalid vision configuration")?;
    info!(
        provider = vision.provider_name(),
        model = vision.model_name(),
        "Vision model configured"
    );

    let scan_config = ScanConfig::from(&config.upload);
    info!(
        max_file_size = scan_config.max_file_size,
        compensate_on_failure = scan_config.compensate_on_failure,
        "Upload limits configured"
    );

    // Create application state
    let state = AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        storage: Arc::new(storage),
        vision,
        scan_config,
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
