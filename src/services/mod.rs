pub mod ai_provider;

pub use ai_provider::{AiError, AiProvider};
