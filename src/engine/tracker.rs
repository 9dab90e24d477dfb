//! Processing activity tracking
//!
//! In-flight work is represented by guards. Creating a [`QueueGuard`]
//! increments `processing_queue`; dropping it decrements it. Because the
//! decrement lives in `Drop`, the counter is restored on every exit path,
//! including early returns and a panicking task.
//!
//! Deep passes are counted the same way: `is_thinking` stays set until the
//! last outstanding [`ThinkingGuard`] is dropped.

use crate::cognition::SystemState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Shared handle that issues processing guards
#[derive(Clone)]
pub struct ProcessingTracker {
    state: Arc<watch::Sender<SystemState>>,
    thinking: Arc<AtomicUsize>,
}

impl ProcessingTracker {
    pub fn new(state: Arc<watch::Sender<SystemState>>) -> Self {
        Self {
            state,
            thinking: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Count one more in-flight operation until the guard is dropped
    pub fn begin(&self) -> QueueGuard {
        self.state.send_modify(|s| *s = s.enqueued());
        tracing::trace!(queue = self.state.borrow().processing_queue, "Processing started");
        QueueGuard {
            state: self.state.clone(),
        }
    }

    /// Mark a deep pass as running until the guard is dropped
    pub fn thinking(&self) -> ThinkingGuard {
        // Counter changes happen under the watch lock so the flag follows them in order.
        self.state.send_modify(|s| {
            self.thinking.fetch_add(1, Ordering::SeqCst);
            *s = s.with_thinking(true);
        });
        ThinkingGuard {
            state: self.state.clone(),
            active: self.thinking.clone(),
        }
    }

    /// Deep passes currently running
    pub fn thinking_passes(&self) -> usize {
        self.thinking.load(Ordering::SeqCst)
    }

    /// Current queue depth
    pub fn in_flight(&self) -> usize {
        self.state.borrow().processing_queue
    }
}

/// One unit of `processing_queue`
#[must_use = "dropping the guard immediately ends the tracked operation"]
pub struct QueueGuard {
    state: Arc<watch::Sender<SystemState>>,
}

impl Drop for QueueGuard {
    fn drop(&mut self) {
        self.state.send_modify(|s| *s = s.dequeued());
    }
}

/// One running deep pass; holds `is_thinking` set
#[must_use = "dropping the guard immediately ends the deep pass"]
pub struct ThinkingGuard {
    state: Arc<watch::Sender<SystemState>>,
    active: Arc<AtomicUsize>,
}

impl Drop for ThinkingGuard {
    fn drop(&mut self) {
        self.state.send_modify(|s| {
            let remaining = self.active.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
            *s = s.with_thinking(remaining > 0);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ProcessingTracker {
        let (tx, _rx) = watch::channel(SystemState::default());
        ProcessingTracker::new(Arc::new(tx))
    }

    #[test]
    fn test_guards_balance_queue() {
        let tracker = tracker();
        let a = tracker.begin();
        let b = tracker.begin();
        assert_eq!(tracker.in_flight(), 2);
        drop(a);
        assert_eq!(tracker.in_flight(), 1);
        drop(b);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn test_thinking_guard() {
        let tracker = tracker();
        let guard = tracker.thinking();
        assert!(tracker.state.borrow().is_thinking);
        drop(guard);
        assert!(!tracker.state.borrow().is_thinking);
    }

    #[test]
    fn test_overlapping_deep_passes_keep_thinking_set() {
        let tracker = tracker();
        let first = tracker.thinking();
        let second = tracker.thinking();
        assert_eq!(tracker.thinking_passes(), 2);

        drop(first);
        assert!(tracker.state.borrow().is_thinking);
        assert_eq!(tracker.thinking_passes(), 1);

        drop(second);
        assert!(!tracker.state.borrow().is_thinking);
        assert_eq!(tracker.thinking_passes(), 0);
    }

    #[tokio::test]
    async fn test_queue_restored_when_task_panics() {
        let tracker = tracker();
        let inner = tracker.clone();
        let handle = tokio::spawn(async move {
            let _guard = inner.begin();
            panic!("extraction task blew up");
        });
        assert!(handle.await.is_err());
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_observers_see_changes() {
        let (tx, mut rx) = watch::channel(SystemState::default());
        let tracker = ProcessingTracker::new(Arc::new(tx));
        let guard = tracker.begin();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().processing_queue, 1);
        drop(guard);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().processing_queue, 0);
    }
}
