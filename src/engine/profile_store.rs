use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::engine::types::UserBehaviorProfile;

/// Process-wide keyed cache of live behavior profiles.
///
/// Each profile sits behind its own mutex so concurrent events for the same
/// user apply their decayed-average updates in event order, while different
/// users never contend. The store is a cache over the durable event log and
/// can be rebuilt from it (see `BehaviorEngine::hydrate`).
#[derive(Default)]
pub struct ProfileStore {
    profiles: RwLock<HashMap<String, Arc<Mutex<UserBehaviorProfile>>>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch-or-create the handle for a user. First access initializes the
    /// profile with its documented defaults.
    pub async fn entry(&self, user_id: &str) -> Arc<Mutex<UserBehaviorProfile>> {
        {
            let profiles = self.profiles.read().await;
            if let Some(handle) = profiles.get(user_id) {
                return Arc::clone(handle);
            }
        }

        let mut profiles = self.profiles.write().await;
        Arc::clone(
            profiles
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(UserBehaviorProfile::new(user_id)))),
        )
    }

    /// Handle for an existing profile, if any. Never creates.
    pub async fn get(&self, user_id: &str) -> Option<Arc<Mutex<UserBehaviorProfile>>> {
        self.profiles.read().await.get(user_id).map(Arc::clone)
    }

    /// Point-in-time copy of a profile.
    pub async fn snapshot(&self, user_id: &str) -> Option<UserBehaviorProfile> {
        let handle = self.get(user_id).await?;
        let profile = handle.lock().await;
        Some(profile.clone())
    }

    /// Handles for every cached profile, for batch passes.
    pub async fn all(&self) -> Vec<Arc<Mutex<UserBehaviorProfile>>> {
        self.profiles.read().await.values().map(Arc::clone).collect()
    }

    pub async fn contains(&self, user_id: &str) -> bool {
        self.profiles.read().await.contains_key(user_id)
    }

    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }

    pub async fn remove(&self, user_id: &str) {
        self.profiles.write().await.remove(user_id);
    }
}
