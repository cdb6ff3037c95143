use std::net::SocketAddr;
use std::sync::Arc;

use eiq_backend_rust::config::Config;
use eiq_backend_rust::db::migrate;
use eiq_backend_rust::logging;
use eiq_backend_rust::workers::WorkerManager;
use eiq_backend_rust::{app, build_state};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config.log_level);

    let state = build_state(&config).await;

    if let Some(db) = state.db_proxy() {
        if let Err(e) = migrate::run_migrations(db.pool()).await {
            tracing::error!(error = %e, "database migrations failed");
        }

        match state.engine().hydrate().await {
            Ok(replayed) => tracing::info!(replayed, "profile hydration complete"),
            Err(e) => tracing::warn!(error = %e, "profile hydration failed"),
        }
    }

    let worker_manager = match WorkerManager::new(
        state.db_proxy(),
        state.engine(),
        state.aggregator(),
    )
    .await
    {
        Ok(manager) => {
            if let Err(e) = manager.start().await {
                tracing::error!(error = %e, "failed to start workers");
            }
            Some(Arc::new(manager))
        }
        Err(e) => {
            tracing::warn!(error = %e, "worker manager not initialized");
            None
        }
    };

    let router = app(state);

    let addr = config.bind_addr();
    tracing::info!(%addr, "eiq-backend listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind listener failed");

    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("HTTP server stopped, initiating graceful shutdown sequence");

    if let Some(ref manager) = worker_manager {
        manager.stop().await;
    }

    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
