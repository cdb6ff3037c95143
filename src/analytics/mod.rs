pub mod aggregator;
pub mod dashboard;

pub use aggregator::{AnalyticsAggregator, RealTimeMetrics};
pub use dashboard::DashboardView;
