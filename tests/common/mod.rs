use std::sync::Arc;

use axum::Router;

use eiq_backend_rust::analytics::AnalyticsAggregator;
use eiq_backend_rust::engine::{BehaviorEngine, EngineConfig};
use eiq_backend_rust::services::AiProvider;
use eiq_backend_rust::state::AppState;

/// A fully wired app with no database and no AI credentials, so every test
/// exercises the degraded-but-serving paths deterministically.
pub fn test_state() -> AppState {
    let engine = Arc::new(BehaviorEngine::new(
        EngineConfig::default(),
        None,
        Arc::new(AiProvider::disabled()),
    ));
    let aggregator = Arc::new(AnalyticsAggregator::new(None, engine.adjustment_counter()));
    AppState::new(None, engine, aggregator)
}

pub fn create_test_app() -> Router {
    eiq_backend_rust::app(test_state())
}
