pub mod config;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod features;
pub mod growth;
pub mod ingestion;
pub mod profile_store;
pub mod strategy;
pub mod types;

pub use config::EngineConfig;
pub use engine::BehaviorEngine;
pub use error::EngineError;
