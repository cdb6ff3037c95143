#![allow(dead_code)]

pub mod analytics;
pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod workers;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::analytics::AnalyticsAggregator;
use crate::config::Config;
use crate::engine::BehaviorEngine;
use crate::services::ai_provider::AiProvider;
use crate::state::AppState;

/// Wire up application state from the environment. The database is
/// optional: without one the service still serves adaptive content from
/// in-memory profiles, it just loses durability and analytics history.
pub async fn build_state(config: &Config) -> AppState {
    let db_proxy = match db::DatabaseProxy::from_env().await {
        Ok(proxy) => Some(proxy),
        Err(err) => {
            tracing::warn!(error = %err, "database proxy not initialized");
            None
        }
    };

    let ai_provider = Arc::new(AiProvider::from_env());
    let engine = Arc::new(BehaviorEngine::new(
        config.engine.clone(),
        db_proxy.clone(),
        ai_provider,
    ));
    let aggregator = Arc::new(AnalyticsAggregator::new(
        db_proxy.clone(),
        engine.adjustment_counter(),
    ));

    AppState::new(db_proxy, engine, aggregator)
}

pub fn app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Convenience for tests: a fully wired router from the environment.
pub async fn create_app() -> axum::Router {
    app(build_state(&Config::from_env()).await)
}
