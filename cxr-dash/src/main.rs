//! cxr-dash - Chest X-ray Analysis Dashboard
//!
//! Serves the browser dashboard and drives the result-acquisition pipeline:
//! classification service (`POST /predict`) → generative explanation service.
//!
//! Configuration: ENV (`CLASSIFIER_URL`, `API_KEY`, `CXR_FALLBACK_POLICY`,
//! `CXR_BIND_ADDRESS`) → TOML (`CXR_CONFIG` or `~/.config/cxr/cxr-dash.toml`)
//! → compiled defaults.

use anyhow::Result;
use cxr_common::config::{config_file_path, load_toml_config, TomlConfig};
use cxr_common::events::EventBus;
use tracing::info;

use cxr_dash::config::{DashboardConfig, CONFIG_FILE_NAME, CONFIG_PATH_ENV};
use cxr_dash::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // TOML is read before tracing so its log level can seed the filter
    let toml_path = config_file_path(CONFIG_PATH_ENV, CONFIG_FILE_NAME);
    let toml_config = match &toml_path {
        Some(path) => Some(load_toml_config(path)),
        None => None,
    };
    let log_level = toml_config
        .as_ref()
        .and_then(|c| c.as_ref().ok())
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    // Build identification immediately after tracing init
    info!(
        "Starting cxr-dash v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let toml_config: TomlConfig = match toml_config {
        Some(loaded) => loaded?,
        None => {
            info!("No platform config directory; using environment and compiled defaults");
            TomlConfig::default()
        }
    };

    let config = DashboardConfig::resolve(&toml_config)?;
    info!(
        classifier_url = %config.classifier.base_url,
        classifier_timeout_ms = config.classifier.timeout.as_millis() as u64,
        fallback_policy = %config.classifier.fallback_policy,
        explanation_model = %config.explanation.model,
        explanation_configured = config.explanation.api_key.is_some(),
        "Configuration resolved"
    );

    let event_bus = EventBus::new(100);
    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, event_bus)?;
    let app = cxr_dash::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
