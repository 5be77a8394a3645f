//! HTTP API handlers for cxr-dash
//!
//! JSON endpoints for upload and analysis, SSE for live updates, and the
//! dashboard page itself.

pub mod analysis;
pub mod health;
pub mod sse;
pub mod ui;
pub mod upload;

pub use analysis::analysis_routes;
pub use health::health_routes;
pub use sse::event_stream;
pub use ui::ui_routes;
pub use upload::upload_routes;
