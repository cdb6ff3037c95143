use thiserror::Error;

/// Failure taxonomy for the behavioral core.
///
/// None of these are allowed to crash the host process: ingestion drops
/// invalid input, generation falls back to static content, persistence and
/// aggregation failures are logged and defaulted.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid interaction event: {0}")]
    Validation(String),

    #[error("behavior profile not found for user {0}")]
    ProfileNotFound(String),

    #[error("question generation failed: {0}")]
    Generation(String),

    #[error("durable write failed: {0}")]
    Persistence(String),

    #[error("analytics aggregation failed: {0}")]
    Aggregation(String),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ProfileNotFound(_) => "PROFILE_NOT_FOUND",
            Self::Generation(_) => "GENERATION_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Aggregation(_) => "AGGREGATION_ERROR",
        }
    }
}
