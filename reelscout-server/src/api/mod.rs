//! HTTP API handlers for the ReelScout server

pub mod connection;
pub mod health;
pub mod prompts;
pub mod sessions;
pub mod sse;
pub mod videos;

pub use connection::connection_routes;
pub use health::health_routes;
pub use prompts::prompt_routes;
pub use sessions::session_routes;
pub use sse::event_stream;
pub use videos::video_routes;
