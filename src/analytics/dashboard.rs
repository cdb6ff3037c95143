//! Read-side composition for the analytics dashboard.
//!
//! A dashboard view stitches window aggregates, the recent snapshot feed
//! and rule-derived insights into one response document.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::db::operations as db_ops;
use crate::db::operations::{
    AnalyticsSnapshot, BucketCount, EventWindowMetrics, LearningWindowMetrics,
    SessionWindowMetrics,
};
use crate::db::DatabaseProxy;
use crate::engine::types::TimeRange;

const RECENT_SNAPSHOT_LIMIT: i64 = 100;

const ENGAGEMENT_INSIGHT_THRESHOLD: f64 = 7.0;
const COMPLETION_INSIGHT_THRESHOLD: f64 = 0.8;
const CONFIDENCE_INSIGHT_THRESHOLD: f64 = 0.8;

const ERROR_RATE_ALERT_THRESHOLD: f64 = 0.05;
const RESPONSE_TIME_ALERT_MS: f64 = 1000.0;
const ABANDONMENT_ALERT_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub active_users: i64,
    pub total_events: i64,
    pub total_sessions: i64,
    pub completion_rate: f64,
    pub error_rate: f64,
}

/// Grouped counts over the range, one list per dimension.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardBreakdowns {
    pub devices: Vec<BucketCount>,
    pub pages: Vec<BucketCount>,
    pub session_types: Vec<BucketCount>,
    pub data_types: Vec<BucketCount>,
    pub validation_statuses: Vec<BucketCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub time_range: String,
    pub summary: DashboardSummary,
    pub user_behavior: EventWindowMetrics,
    pub session_metrics: SessionWindowMetrics,
    pub ai_learning: LearningWindowMetrics,
    pub breakdowns: DashboardBreakdowns,
    pub real_time_metrics: Vec<AnalyticsSnapshot>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl DashboardView {
    /// Assemble the dashboard for one time range. Sub-queries degrade
    /// independently, the same policy the aggregator uses.
    pub async fn build(db: &DatabaseProxy, time_range: TimeRange) -> Self {
        let since = Utc::now() - time_range.duration();

        let user_behavior = db_ops::event_window_metrics(db, since)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "dashboard event metrics query failed, defaulting");
                EventWindowMetrics::default()
            });

        let session_metrics = db_ops::session_window_metrics(db, since)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "dashboard session metrics query failed, defaulting");
                SessionWindowMetrics::default()
            });

        let ai_learning = db_ops::learning_window_metrics(db, since)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "dashboard learning metrics query failed, defaulting");
                LearningWindowMetrics::default()
            });

        let breakdowns = fetch_breakdowns(db, since).await;

        let real_time_metrics = db_ops::fetch_recent_snapshots(db, None, RECENT_SNAPSHOT_LIMIT)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "dashboard snapshot feed query failed, defaulting");
                Vec::new()
            });

        let error_rate =
            crate::analytics::aggregator::error_rate(user_behavior.total_events, user_behavior.error_events);
        let completion_rate = ratio(session_metrics.completed, session_metrics.total_sessions);

        let insights = derive_insights(&user_behavior, &session_metrics, &ai_learning);
        let recommendations = derive_recommendations(&user_behavior, &session_metrics, error_rate);

        Self {
            time_range: time_range.as_str().to_string(),
            summary: DashboardSummary {
                active_users: user_behavior.active_users,
                total_events: user_behavior.total_events,
                total_sessions: session_metrics.total_sessions,
                completion_rate,
                error_rate,
            },
            user_behavior,
            session_metrics,
            ai_learning,
            breakdowns,
            real_time_metrics,
            insights,
            recommendations,
            generated_at: Utc::now(),
        }
    }
}

async fn fetch_breakdowns(db: &DatabaseProxy, since: DateTime<Utc>) -> DashboardBreakdowns {
    fn or_empty(result: Result<Vec<BucketCount>, sqlx::Error>, dimension: &str) -> Vec<BucketCount> {
        result.unwrap_or_else(|e| {
            warn!(error = %e, dimension, "dashboard breakdown query failed, defaulting");
            Vec::new()
        })
    }

    DashboardBreakdowns {
        devices: or_empty(db_ops::device_breakdown(db, since).await, "devices"),
        pages: or_empty(db_ops::page_breakdown(db, since).await, "pages"),
        session_types: or_empty(
            db_ops::session_type_breakdown(db, since).await,
            "sessionTypes",
        ),
        data_types: or_empty(db_ops::data_type_breakdown(db, since).await, "dataTypes"),
        validation_statuses: or_empty(
            db_ops::validation_status_breakdown(db, since).await,
            "validationStatuses",
        ),
    }
}

fn ratio(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Engagement proxy over a window: events per active user on the same 0-10
/// scale as per-payload engagement scoring.
fn engagement_estimate(events: &EventWindowMetrics) -> f64 {
    if events.active_users <= 0 {
        return 0.0;
    }
    let per_user = events.total_events as f64 / events.active_users as f64;
    (per_user / 10.0).min(10.0)
}

pub fn derive_insights(
    events: &EventWindowMetrics,
    sessions: &SessionWindowMetrics,
    learning: &LearningWindowMetrics,
) -> Vec<String> {
    let mut insights = Vec::new();

    if engagement_estimate(events) > ENGAGEMENT_INSIGHT_THRESHOLD {
        insights.push("Users are highly engaged in this window".to_string());
    }
    if ratio(sessions.completed, sessions.total_sessions) > COMPLETION_INSIGHT_THRESHOLD {
        insights.push("Assessment completion rate is strong".to_string());
    }
    if learning.avg_confidence > CONFIDENCE_INSIGHT_THRESHOLD {
        insights.push("AI learning confidence is high".to_string());
    }

    insights
}

pub fn derive_recommendations(
    events: &EventWindowMetrics,
    sessions: &SessionWindowMetrics,
    error_rate: f64,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if error_rate > ERROR_RATE_ALERT_THRESHOLD {
        recommendations.push("Investigate elevated error rate".to_string());
    }
    if events.avg_response_time_ms > RESPONSE_TIME_ALERT_MS {
        recommendations.push("Optimize question delivery response times".to_string());
    }
    if ratio(sessions.abandoned, sessions.total_sessions) > ABANDONMENT_ALERT_THRESHOLD {
        recommendations.push("Review assessment length; abandonment is high".to_string());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(total: i64, users: i64, errors: i64, avg_rt: f64) -> EventWindowMetrics {
        EventWindowMetrics {
            total_events: total,
            active_users: users,
            error_events: errors,
            avg_response_time_ms: avg_rt,
        }
    }

    fn sessions(total: i64, completed: i64, abandoned: i64) -> SessionWindowMetrics {
        SessionWindowMetrics {
            total_sessions: total,
            in_progress: total - completed - abandoned,
            completed,
            abandoned,
            avg_duration_secs: 0.0,
        }
    }

    #[test]
    fn quiet_windows_yield_no_insights_or_recommendations() {
        let e = events(0, 0, 0, 0.0);
        let s = sessions(0, 0, 0);
        let l = LearningWindowMetrics::default();

        assert!(derive_insights(&e, &s, &l).is_empty());
        assert!(derive_recommendations(&e, &s, 0.0).is_empty());
    }

    #[test]
    fn insight_rules_stack_independently() {
        let e = events(800, 10, 0, 200.0);
        let s = sessions(10, 9, 0);
        let l = LearningWindowMetrics {
            total_records: 50,
            avg_confidence: 0.85,
            avg_learning_velocity: 0.6,
            validated_records: 10,
        };

        let insights = derive_insights(&e, &s, &l);
        assert_eq!(insights.len(), 3);
    }

    #[test]
    fn recommendation_rules_fire_on_their_thresholds() {
        let e = events(100, 10, 6, 1500.0);
        let s = sessions(10, 4, 5);

        let recs = derive_recommendations(&e, &s, 0.06);
        assert_eq!(recs.len(), 3);

        // Exactly at a threshold does not fire.
        let quiet = derive_recommendations(&events(100, 10, 5, 1000.0), &sessions(10, 6, 4), 0.05);
        assert!(quiet.is_empty());
    }

    #[test]
    fn engagement_estimate_caps_at_ten() {
        assert_eq!(engagement_estimate(&events(10_000, 10, 0, 0.0)), 10.0);
        assert_eq!(engagement_estimate(&events(0, 0, 0, 0.0)), 0.0);
        assert_eq!(engagement_estimate(&events(500, 10, 0, 0.0)), 5.0);
    }
}
