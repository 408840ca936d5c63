//! Service layer: automation driver client, connection lifecycle, LLM
//! engines, per-reel pipeline, and the session orchestrator.

pub mod analysis;
pub mod connection;
pub mod driver;
pub mod orchestrator;
pub mod pipeline;

pub use connection::ConnectionManager;
pub use orchestrator::SessionOrchestrator;
pub use pipeline::ReelAnalysisPipeline;
