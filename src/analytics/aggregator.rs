//! Windowed real-time metrics over the durable event, session and learning
//! tables.
//!
//! Each sub-metric is queried independently and degrades to its zero value
//! on failure, so one broken query never blanks the whole snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::operations as db_ops;
use crate::db::operations::{
    EngagementWindowMetrics, EventWindowMetrics, ExperimentResult, LearningWindowMetrics,
    SessionWindowMetrics,
};
use crate::db::DatabaseProxy;
use crate::engine::types::TimeWindow;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealTimeMetrics {
    pub window: String,
    // Platform
    pub active_users: i64,
    pub new_users: i64,
    pub total_events: i64,
    pub completion_rate: f64,
    pub error_rate: f64,
    pub avg_response_time_ms: f64,
    pub tests_in_progress: i64,
    pub tests_completed: i64,
    pub sessions_abandoned: i64,
    // Engagement
    pub avg_session_duration_secs: f64,
    pub pages_per_session: f64,
    pub bounce_rate: f64,
    pub conversion_rate: f64,
    // AI
    pub ai_interactions: i64,
    pub hints_generated: i64,
    pub adaptive_adjustments: i64,
    pub learning_efficiency: f64,
    pub learning_records: i64,
    pub avg_learning_confidence: f64,
    pub experiment_results: Vec<ExperimentResult>,
    pub computed_at: DateTime<Utc>,
}

impl RealTimeMetrics {
    fn empty(window: TimeWindow) -> Self {
        Self {
            window: window.as_str().to_string(),
            active_users: 0,
            new_users: 0,
            total_events: 0,
            completion_rate: 0.0,
            error_rate: 0.0,
            avg_response_time_ms: 0.0,
            tests_in_progress: 0,
            tests_completed: 0,
            sessions_abandoned: 0,
            avg_session_duration_secs: 0.0,
            pages_per_session: 0.0,
            bounce_rate: 0.0,
            conversion_rate: 0.0,
            ai_interactions: 0,
            hints_generated: 0,
            adaptive_adjustments: 0,
            learning_efficiency: 0.0,
            learning_records: 0,
            avg_learning_confidence: 0.0,
            experiment_results: Vec::new(),
            computed_at: Utc::now(),
        }
    }
}

/// Share of error events among all events in a window. Empty windows have
/// no error rate, not a divide-by-zero.
pub fn error_rate(total_events: i64, error_events: i64) -> f64 {
    share(error_events, total_events)
}

/// Part over whole, with empty wholes yielding zero instead of a
/// divide-by-zero.
pub fn share(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

pub struct AnalyticsAggregator {
    db: Option<Arc<DatabaseProxy>>,
    /// Lifetime feedback-loop adjustment count, shared with the engine.
    adjustments: Arc<AtomicU64>,
}

impl AnalyticsAggregator {
    pub fn new(db: Option<Arc<DatabaseProxy>>, adjustments: Arc<AtomicU64>) -> Self {
        Self { db, adjustments }
    }

    /// Compute a point-in-time metrics view for one window. Pure read, no
    /// snapshot written.
    pub async fn collect(&self, window: TimeWindow) -> RealTimeMetrics {
        let Some(db) = &self.db else {
            // The feedback-loop counter is in-process; report it even when
            // the durable sub-metrics are unavailable.
            let mut metrics = RealTimeMetrics::empty(window);
            metrics.adaptive_adjustments = self.adjustments.load(Ordering::Relaxed) as i64;
            return metrics;
        };

        let since = Utc::now() - window.duration();

        let events = match db_ops::event_window_metrics(db, since).await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(error = %e, window = window.as_str(), "event metrics query failed, defaulting");
                EventWindowMetrics::default()
            }
        };

        let sessions = match db_ops::session_window_metrics(db, since).await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(error = %e, window = window.as_str(), "session metrics query failed, defaulting");
                SessionWindowMetrics::default()
            }
        };

        let learning = match db_ops::learning_window_metrics(db, since).await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(error = %e, window = window.as_str(), "learning metrics query failed, defaulting");
                LearningWindowMetrics::default()
            }
        };

        let engagement = match db_ops::engagement_window_metrics(db, since).await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(error = %e, window = window.as_str(), "engagement metrics query failed, defaulting");
                EngagementWindowMetrics::default()
            }
        };

        let experiment_results = match db_ops::experiment_results(db, since).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, window = window.as_str(), "experiment results query failed, defaulting");
                Vec::new()
            }
        };

        RealTimeMetrics {
            window: window.as_str().to_string(),
            active_users: events.active_users,
            new_users: engagement.new_users,
            total_events: events.total_events,
            completion_rate: share(sessions.completed, sessions.total_sessions),
            error_rate: error_rate(events.total_events, events.error_events),
            avg_response_time_ms: events.avg_response_time_ms,
            tests_in_progress: sessions.in_progress,
            tests_completed: sessions.completed,
            sessions_abandoned: sessions.abandoned,
            avg_session_duration_secs: sessions.avg_duration_secs,
            pages_per_session: share(engagement.page_views, engagement.event_sessions),
            bounce_rate: share(engagement.single_event_sessions, engagement.event_sessions),
            conversion_rate: share(sessions.completed, engagement.event_sessions),
            ai_interactions: learning.total_records,
            hints_generated: engagement.hint_requests,
            adaptive_adjustments: self.adjustments.load(Ordering::Relaxed) as i64,
            learning_efficiency: learning.avg_learning_velocity,
            learning_records: learning.total_records,
            avg_learning_confidence: learning.avg_confidence,
            experiment_results,
            computed_at: Utc::now(),
        }
    }

    /// One aggregation tick: collect the window and write it out as an
    /// immutable snapshot. Returns the metrics either way; a failed write
    /// only loses the historical record, not the live view.
    pub async fn tick(&self, window: TimeWindow) -> RealTimeMetrics {
        let metrics = self.collect(window).await;

        if let Some(db) = &self.db {
            match serde_json::to_value(&metrics) {
                Ok(payload) => {
                    if let Err(e) = db_ops::insert_snapshot(db, window.as_str(), &payload).await {
                        warn!(error = %e, window = window.as_str(), "failed to persist analytics snapshot");
                    } else {
                        info!(
                            window = window.as_str(),
                            active_users = metrics.active_users,
                            total_events = metrics.total_events,
                            "analytics snapshot recorded"
                        );
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to serialize analytics snapshot");
                }
            }
        }

        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_aggregator() -> AnalyticsAggregator {
        AnalyticsAggregator::new(None, Arc::new(AtomicU64::new(0)))
    }

    #[test]
    fn error_rate_is_zero_for_empty_windows() {
        assert_eq!(error_rate(0, 0), 0.0);
        assert_eq!(error_rate(-1, 5), 0.0);
    }

    #[test]
    fn error_rate_is_a_plain_ratio() {
        assert_eq!(error_rate(200, 10), 0.05);
        assert_eq!(error_rate(4, 1), 0.25);
    }

    #[test]
    fn share_guards_empty_denominators() {
        assert_eq!(share(5, 0), 0.0);
        assert_eq!(share(30, 10), 3.0);
        assert_eq!(share(4, 16), 0.25);
    }

    #[tokio::test]
    async fn collect_without_database_yields_empty_metrics() {
        let aggregator = test_aggregator();
        let metrics = aggregator.collect(TimeWindow::FiveMinutes).await;
        assert_eq!(metrics.window, "5min");
        assert_eq!(metrics.active_users, 0);
        assert_eq!(metrics.error_rate, 0.0);
        assert_eq!(metrics.pages_per_session, 0.0);
        assert_eq!(metrics.bounce_rate, 0.0);
        assert_eq!(metrics.hints_generated, 0);
        assert_eq!(metrics.learning_efficiency, 0.0);
        assert!(metrics.experiment_results.is_empty());
    }

    #[tokio::test]
    async fn adjustment_counter_feeds_the_snapshot() {
        let counter = Arc::new(AtomicU64::new(0));
        let aggregator = AnalyticsAggregator::new(None, Arc::clone(&counter));
        counter.store(7, Ordering::Relaxed);

        let metrics = aggregator.collect(TimeWindow::FiveMinutes).await;
        assert_eq!(metrics.adaptive_adjustments, 7);
    }

    #[tokio::test]
    async fn repeated_collection_is_stable_for_fixed_inputs() {
        let aggregator = test_aggregator();
        let a = aggregator.collect(TimeWindow::OneHour).await;
        let b = aggregator.collect(TimeWindow::OneHour).await;
        assert_eq!(a.total_events, b.total_events);
        assert_eq!(a.error_rate, b.error_rate);
    }
}
