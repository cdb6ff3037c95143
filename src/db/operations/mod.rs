#![allow(dead_code)]

use serde::Serialize;

/// One grouped-count row from a breakdown query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCount {
    pub key: String,
    pub count: i64,
}

impl BucketCount {
    pub(crate) fn from_rows(rows: Vec<(Option<String>, i64)>) -> Vec<Self> {
        rows.into_iter()
            .map(|(key, count)| Self {
                key: key.unwrap_or_else(|| "unknown".to_string()),
                count,
            })
            .collect()
    }
}

pub mod assessments;
pub mod behavior_events;
pub mod learning_records;
pub mod sessions;
pub mod snapshots;

#[allow(unused_imports)]
pub use assessments::*;
#[allow(unused_imports)]
pub use behavior_events::*;
#[allow(unused_imports)]
pub use learning_records::*;
#[allow(unused_imports)]
pub use sessions::*;
#[allow(unused_imports)]
pub use snapshots::*;
