//! UI Routes - dashboard page for cxr-dash
//!
//! Vanilla HTML/CSS/JS. The page only renders state it reads from
//! `/api/analysis` and `/api/events`; all transitions happen server-side.

use crate::AppState;
use axum::{routing::get, Router};

mod root;
mod static_assets;

use root::root_page;
use static_assets::{serve_dashboard_css, serve_dashboard_js};

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root_page))
        .route("/static/dashboard.js", get(serve_dashboard_js))
        .route("/static/dashboard.css", get(serve_dashboard_css))
}
