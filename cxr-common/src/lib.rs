//! # CXR Common Library
//!
//! Shared code for the chest X-ray dashboard services:
//! - Error type used by configuration and IO helpers
//! - Event types (DashEvent enum) and the broadcast EventBus
//! - TOML configuration model and file resolution
//! - Server-Sent Events helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
