#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::analytics::AnalyticsAggregator;
use crate::db::operations as db_ops;
use crate::db::DatabaseProxy;
use crate::engine::types::TimeWindow;
use crate::engine::BehaviorEngine;

static WORKER_LEADER: AtomicBool = AtomicBool::new(false);

const STALE_SESSION_MINUTES: i64 = 60;

pub fn is_worker_leader() -> bool {
    WORKER_LEADER.load(Ordering::Relaxed)
}

fn set_worker_leader(val: bool) {
    WORKER_LEADER.store(val, Ordering::Relaxed);
}

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    db_proxy: Option<Arc<DatabaseProxy>>,
    engine: Arc<BehaviorEngine>,
    aggregator: Arc<AnalyticsAggregator>,
}

impl WorkerManager {
    pub async fn new(
        db_proxy: Option<Arc<DatabaseProxy>>,
        engine: Arc<BehaviorEngine>,
        aggregator: Arc<AnalyticsAggregator>,
    ) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await.map_err(WorkerError::Scheduler)?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            db_proxy,
            engine,
            aggregator,
        })
    }

    pub async fn start(&self) -> Result<(), WorkerError> {
        let leader = std::env::var("WORKER_LEADER")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        if !leader {
            info!("WORKER_LEADER not set, skipping worker startup");
            return Ok(());
        }

        set_worker_leader(true);
        info!("Starting workers (leader mode)");

        let enable_analytics = std::env::var("ENABLE_ANALYTICS_WORKER")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let enable_adaptation = std::env::var("ENABLE_ADAPTATION_WORKER")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let scheduler = self.scheduler.lock().await;

        if enable_analytics {
            let schedule = std::env::var("ANALYTICS_SCHEDULE")
                .unwrap_or_else(|_| "0 */5 * * * *".to_string());
            let aggregator = Arc::clone(&self.aggregator);
            let db = self.db_proxy.clone();
            let shutdown_rx = self.shutdown_tx.subscribe();
            let job = Job::new_async(&schedule, move |_uuid, _lock| {
                let aggregator = Arc::clone(&aggregator);
                let db = db.clone();
                let mut rx = shutdown_rx.resubscribe();
                Box::pin(async move {
                    tokio::select! {
                        _ = rx.recv() => {},
                        _ = run_analytics_tick(aggregator, db) => {}
                    }
                })
            })
            .map_err(WorkerError::Scheduler)?;
            scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
            info!(schedule = %schedule, "Analytics aggregation worker scheduled");
        }

        if enable_adaptation {
            let schedule = std::env::var("ADAPTATION_SCHEDULE")
                .unwrap_or_else(|_| "0 0 * * * *".to_string());
            let engine = Arc::clone(&self.engine);
            let shutdown_rx = self.shutdown_tx.subscribe();
            let job = Job::new_async(&schedule, move |_uuid, _lock| {
                let engine = Arc::clone(&engine);
                let mut rx = shutdown_rx.resubscribe();
                Box::pin(async move {
                    tokio::select! {
                        _ = rx.recv() => {},
                        result = engine.run_adaptation_pass() => {
                            match result {
                                Ok(summary) => {
                                    let retraining = engine.drain_retraining_signals().await;
                                    if !retraining.is_empty() {
                                        info!(users = retraining.len(), "retraining signals drained");
                                    }
                                    info!(
                                        adjusted = summary.profiles_adjusted,
                                        "Adaptation worker pass finished"
                                    );
                                }
                                Err(e) => error!(error = %e, "Adaptation worker error"),
                            }
                        }
                    }
                })
            })
            .map_err(WorkerError::Scheduler)?;
            scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
            info!(schedule = %schedule, "Adaptation worker scheduled");
        }

        scheduler.start().await.map_err(WorkerError::Scheduler)?;
        info!("All workers started");

        Ok(())
    }

    pub async fn stop(&self) {
        if !is_worker_leader() {
            return;
        }

        info!("Stopping workers...");
        let _ = self.shutdown_tx.send(());

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "Error shutting down scheduler");
        }

        set_worker_leader(false);
        info!("Workers stopped");
    }
}

/// One analytics tick: sweep stale sessions to abandoned first so the
/// snapshot reflects them, then record the 5-minute window.
async fn run_analytics_tick(
    aggregator: Arc<AnalyticsAggregator>,
    db: Option<Arc<DatabaseProxy>>,
) {
    if let Some(db) = &db {
        let stale_before = Utc::now() - ChronoDuration::minutes(STALE_SESSION_MINUTES);
        match db_ops::mark_stale_sessions_abandoned(db, stale_before).await {
            Ok(0) => {}
            Ok(swept) => info!(swept, "stale sessions marked abandoned"),
            Err(e) => warn!(error = %e, "stale session sweep failed"),
        }
    }

    aggregator.tick(TimeWindow::FiveMinutes).await;
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("scheduler error: {0}")]
    Scheduler(tokio_cron_scheduler::JobSchedulerError),
}
