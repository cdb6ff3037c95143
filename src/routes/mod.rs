mod adaptive;
mod analytics;
mod health;
mod tracking;

use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/tracking", tracking::router())
        .nest("/api/adaptive", adaptive::router())
        .nest("/api/analytics", analytics::router())
        .with_state(state)
}
