//! Stub upstream services
//!
//! Real HTTP servers on 127.0.0.1:0 standing in for the classification and
//! explanation services, so the production clients are exercised end-to-end.

use axum::Router;
use cxr_dash::config::{DashboardConfig, FallbackPolicy};
use std::time::Duration;

/// Serve `router` on an ephemeral port; returns its base URL
pub async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });

    format!("http://{}", addr)
}

/// Base URL of a port with nothing listening (connection refused)
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{}", addr)
}

/// Configuration with short timeouts and no simulated delay
pub fn test_config(classifier_url: &str, explanation_url: &str) -> DashboardConfig {
    let mut config = DashboardConfig::default();
    config.classifier.base_url = classifier_url.to_string();
    config.classifier.timeout = Duration::from_millis(500);
    config.classifier.fallback_policy = FallbackPolicy::Simulate;
    config.classifier.simulation_delay = Duration::ZERO;
    config.explanation.base_url = explanation_url.to_string();
    config.explanation.api_key = Some("test-key".to_string());
    config.explanation.model = "test-model".to_string();
    config.explanation.timeout = Duration::from_millis(500);
    config
}
