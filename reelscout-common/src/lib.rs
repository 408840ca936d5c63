//! # ReelScout Common Library
//!
//! Shared code for the ReelScout service:
//! - Persisted record types (videos, sessions, prompts, driver connection)
//! - Event types (ReelEvent enum) and the EventBus
//! - Common error types
//! - Configuration loading
//! - Engagement count normalization ("1.2K" → 1200)

pub mod config;
pub mod engagement;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
pub use events::{EventBus, ReelEvent};
