//! Static asset handlers for the dashboard
//!
//! Embeds CSS/JS at compile time

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

const DASHBOARD_JS: &str = include_str!("../../../static/dashboard.js");
const DASHBOARD_CSS: &str = include_str!("../../../static/dashboard.css");

fn asset(content_type: &'static str, body: &'static str) -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", content_type),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        body,
    )
        .into_response()
}

/// GET /static/dashboard.js
pub async fn serve_dashboard_js() -> Response {
    asset("application/javascript", DASHBOARD_JS)
}

/// GET /static/dashboard.css
pub async fn serve_dashboard_css() -> Response {
    asset("text/css", DASHBOARD_CSS)
}
