//! Job id to observer membership.
//!
//! The registry holds [`Weak`] references: it never keeps a connection
//! alive, and an observer dropped without explicit removal simply stops
//! appearing in snapshots. A job id is present only while at least one
//! observer is subscribed to it.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use jobwire_core::types::JobId;
use tokio::sync::RwLock;

use crate::ws::observer::{ConnId, Observer};

type Members = HashMap<ConnId, Weak<dyn Observer>>;

/// Thread-safe subscription map shared by the gateway and the relay.
///
/// One coarse lock guards the whole map. Callers never hold it across a
/// send: [`SubscriptionRegistry::snapshot`] copies the observers out first.
pub struct SubscriptionRegistry {
    jobs: RwLock<HashMap<JobId, Members>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Add `observer` to `job_id`'s set.
    ///
    /// Returns `false` if it was already a member; the set is unchanged.
    pub async fn subscribe(&self, job_id: &str, observer: &Arc<dyn Observer>) -> bool {
        let mut jobs = self.jobs.write().await;
        let members = jobs.entry(job_id.to_string()).or_default();
        if members.contains_key(observer.id()) {
            return false;
        }
        members.insert(observer.id().to_string(), Arc::downgrade(observer));
        true
    }

    /// Remove one membership. Unknown job or observer is a no-op.
    ///
    /// Returns whether a membership was removed.
    pub async fn unsubscribe(&self, job_id: &str, observer_id: &str) -> bool {
        let mut jobs = self.jobs.write().await;
        let Some(members) = jobs.get_mut(job_id) else {
            return false;
        };
        let removed = members.remove(observer_id).is_some();
        if members.is_empty() {
            jobs.remove(job_id);
        }
        removed
    }

    /// Remove `observer_id` from every set, dropping keys left empty.
    ///
    /// Returns the number of memberships removed.
    pub async fn remove_observer_everywhere(&self, observer_id: &str) -> usize {
        let mut jobs = self.jobs.write().await;
        let mut removed = 0;
        jobs.retain(|_, members| {
            if members.remove(observer_id).is_some() {
                removed += 1;
            }
            !members.is_empty()
        });
        removed
    }

    /// Point-in-time copy of the live observers of `job_id`.
    pub async fn snapshot(&self, job_id: &str) -> Vec<Arc<dyn Observer>> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .map(|members| members.values().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }

    /// Number of job ids with at least one observer.
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Number of observers subscribed to `job_id`.
    pub async fn subscriber_count(&self, job_id: &str) -> usize {
        self.jobs.read().await.get(job_id).map_or(0, HashMap::len)
    }

    /// Job ids `observer_id` is subscribed to, in no particular order.
    pub async fn jobs_for(&self, observer_id: &str) -> Vec<JobId> {
        self.jobs
            .read()
            .await
            .iter()
            .filter(|(_, members)| members.contains_key(observer_id))
            .map(|(job_id, _)| job_id.clone())
            .collect()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
