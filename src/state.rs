use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::analytics::AnalyticsAggregator;
use crate::db::DatabaseProxy;
use crate::engine::BehaviorEngine;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    db_proxy: Option<Arc<DatabaseProxy>>,
    engine: Arc<BehaviorEngine>,
    aggregator: Arc<AnalyticsAggregator>,
}

impl AppState {
    pub fn new(
        db_proxy: Option<Arc<DatabaseProxy>>,
        engine: Arc<BehaviorEngine>,
        aggregator: Arc<AnalyticsAggregator>,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            db_proxy,
            engine,
            aggregator,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn db_proxy(&self) -> Option<Arc<DatabaseProxy>> {
        self.db_proxy.clone()
    }

    pub fn engine(&self) -> Arc<BehaviorEngine> {
        Arc::clone(&self.engine)
    }

    pub fn aggregator(&self) -> Arc<AnalyticsAggregator> {
        Arc::clone(&self.aggregator)
    }
}
