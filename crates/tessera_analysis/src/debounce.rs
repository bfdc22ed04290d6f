//! Debounce guard: best-effort suppression of duplicate analysis calls
//! for the same entry within a configurable window.
//!
//! This is de-duplication, not mutual exclusion. Two callers racing
//! within the same tick may both pass the check; the worst case is a
//! harmless duplicate network call, which the delete-then-recreate
//! materialization absorbs.

use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

/// Maps entry id to the time of the last analysis attempt. Markers
/// older than the window are evicted on every check.
#[derive(Debug)]
pub struct DebounceGuard {
    window: Duration,
    markers: Mutex<HashMap<Uuid, Instant>>,
}

impl DebounceGuard {
    /// A zero window disables debouncing entirely.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            markers: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt for `id` unless a fresh one already exists.
    /// Returns false when the caller should skip the call entirely
    /// (already in-flight or just-completed).
    pub async fn try_begin(&self, id: Uuid) -> bool {
        if self.window.is_zero() {
            return true;
        }
        let now = Instant::now();
        let mut markers = self.markers.lock().await;
        markers.retain(|_, at| now.duration_since(*at) < self.window);
        if markers.contains_key(&id) {
            return false;
        }
        markers.insert(id, now);
        true
    }

    /// Forget the marker for `id`, so a failed attempt can be retried
    /// immediately instead of waiting out the window.
    pub async fn clear(&self, id: Uuid) {
        self.markers.lock().await.remove(&id);
    }

    /// Number of live markers (stale ones included until next check).
    pub async fn marker_count(&self) -> usize {
        self.markers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_within_window_is_suppressed() {
        let guard = DebounceGuard::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        assert!(guard.try_begin(id).await);
        assert!(!guard.try_begin(id).await);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!guard.try_begin(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_expires_after_window() {
        let guard = DebounceGuard::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        assert!(guard.try_begin(id).await);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(guard.try_begin(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_ids_do_not_interfere() {
        let guard = DebounceGuard::new(Duration::from_secs(60));
        assert!(guard.try_begin(Uuid::new_v4()).await);
        assert!(guard.try_begin(Uuid::new_v4()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_allows_immediate_retry() {
        let guard = DebounceGuard::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        assert!(guard.try_begin(id).await);
        guard.clear(id).await;
        assert!(guard.try_begin(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_markers_are_evicted() {
        let guard = DebounceGuard::new(Duration::from_secs(10));
        for _ in 0..5 {
            assert!(guard.try_begin(Uuid::new_v4()).await);
        }
        assert_eq!(guard.marker_count().await, 5);

        tokio::time::advance(Duration::from_secs(11)).await;
        // Next check sweeps out everything stale
        assert!(guard.try_begin(Uuid::new_v4()).await);
        assert_eq!(guard.marker_count().await, 1);
    }

    #[tokio::test]
    async fn test_zero_window_disables_debounce() {
        let guard = DebounceGuard::new(Duration::ZERO);
        let id = Uuid::new_v4();
        assert!(guard.try_begin(id).await);
        assert!(guard.try_begin(id).await);
    }
}
