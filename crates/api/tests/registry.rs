//! Tests for `SubscriptionRegistry` membership rules.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use jobwire_api::ws::{Observer, SendError, SubscriptionRegistry};

struct FakeObserver {
    id: String,
    open: AtomicBool,
    frames: Mutex<Vec<String>>,
}

impl Observer for FakeObserver {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send(&self, frame: &str) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::Closed);
        }
        self.frames.lock().unwrap().push(frame.to_string());
        Ok(())
    }
}

fn observer(id: &str) -> Arc<dyn Observer> {
    Arc::new(FakeObserver {
        id: id.to_string(),
        open: AtomicBool::new(true),
        frames: Mutex::new(Vec::new()),
    })
}

fn ids(observers: &[Arc<dyn Observer>]) -> Vec<String> {
    let mut ids: Vec<String> = observers.iter().map(|o| o.id().to_string()).collect();
    ids.sort();
    ids
}

// ---------------------------------------------------------------------------
// Test: unknown job id has no observers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn snapshot_of_unknown_job_is_empty() {
    let registry = SubscriptionRegistry::new();

    assert!(registry.snapshot("never-subscribed").await.is_empty());
    assert_eq!(registry.job_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: subscribing twice leaves one membership
// ---------------------------------------------------------------------------

#[tokio::test]
async fn subscribe_is_idempotent() {
    let registry = SubscriptionRegistry::new();
    let o = observer("o1");

    assert!(registry.subscribe("J1", &o).await);
    assert!(!registry.subscribe("J1", &o).await);

    assert_eq!(registry.subscriber_count("J1").await, 1);
    assert_eq!(ids(&registry.snapshot("J1").await), vec!["o1"]);
}

// ---------------------------------------------------------------------------
// Test: last unsubscribe removes the job id entirely
// ---------------------------------------------------------------------------

#[tokio::test]
async fn last_unsubscribe_removes_job_key() {
    let registry = SubscriptionRegistry::new();
    let a = observer("a");
    let b = observer("b");
    registry.subscribe("J1", &a).await;
    registry.subscribe("J1", &b).await;

    assert!(registry.unsubscribe("J1", "a").await);
    assert_eq!(registry.job_count().await, 1);

    assert!(registry.unsubscribe("J1", "b").await);
    assert_eq!(registry.job_count().await, 0);
    assert_eq!(registry.subscriber_count("J1").await, 0);
}

// ---------------------------------------------------------------------------
// Test: unsubscribe for unknown job or observer is a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsubscribe_unknown_is_noop() {
    let registry = SubscriptionRegistry::new();
    let a = observer("a");
    registry.subscribe("J1", &a).await;

    assert!(!registry.unsubscribe("J2", "a").await);
    assert!(!registry.unsubscribe("J1", "nobody").await);

    assert_eq!(registry.subscriber_count("J1").await, 1);
}

// ---------------------------------------------------------------------------
// Test: one observer can watch several jobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn observer_can_watch_many_jobs() {
    let registry = SubscriptionRegistry::new();
    let o = observer("o1");
    for job in ["J1", "J2", "J3"] {
        registry.subscribe(job, &o).await;
    }

    let mut jobs = registry.jobs_for("o1").await;
    jobs.sort();
    assert_eq!(jobs, vec!["J1", "J2", "J3"]);
}

// ---------------------------------------------------------------------------
// Test: remove_observer_everywhere clears every membership in one call
// ---------------------------------------------------------------------------

#[tokio::test]
async fn remove_everywhere_clears_all_memberships() {
    let registry = SubscriptionRegistry::new();
    let leaving = observer("leaving");
    let staying = observer("staying");
    for job in ["J1", "J2", "J3", "J4"] {
        registry.subscribe(job, &leaving).await;
    }
    registry.subscribe("J2", &staying).await;

    assert_eq!(registry.remove_observer_everywhere("leaving").await, 4);

    assert!(registry.jobs_for("leaving").await.is_empty());
    // Only J2 still has a subscriber.
    assert_eq!(registry.job_count().await, 1);
    assert_eq!(ids(&registry.snapshot("J2").await), vec!["staying"]);
}

// ---------------------------------------------------------------------------
// Test: remove_observer_everywhere with no subscriptions is a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn remove_everywhere_without_subscriptions_is_noop() {
    let registry = SubscriptionRegistry::new();
    let other = observer("other");
    registry.subscribe("J1", &other).await;

    assert_eq!(registry.remove_observer_everywhere("idle").await, 0);
    assert_eq!(registry.subscriber_count("J1").await, 1);
}

// ---------------------------------------------------------------------------
// Test: the registry does not keep observers alive
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dropped_observer_disappears_from_snapshot() {
    let registry = SubscriptionRegistry::new();
    let kept = observer("kept");
    let dropped = observer("dropped");
    registry.subscribe("J1", &kept).await;
    registry.subscribe("J1", &dropped).await;

    drop(dropped);

    assert_eq!(ids(&registry.snapshot("J1").await), vec!["kept"]);
}

// ---------------------------------------------------------------------------
// Test: concurrent subscribe/unsubscribe leaves no dangling keys
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_churn_leaves_registry_empty() {
    let registry = Arc::new(SubscriptionRegistry::new());
    let mut tasks = Vec::new();

    for i in 0..50 {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::spawn(async move {
            let o = observer(&format!("o{i}"));
            let job = format!("J{}", i % 5);
            registry.subscribe(&job, &o).await;
            registry.subscribe("shared", &o).await;
            registry.unsubscribe(&job, o.id()).await;
            registry.remove_observer_everywhere(o.id()).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(registry.job_count().await, 0);
}
