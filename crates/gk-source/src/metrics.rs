use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Compteurs du pipeline vidéo, incrémentés sans verrou.
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    sessions_created: AtomicU64,
    frames_processed: AtomicU64,
    active_sessions: AtomicU64,
}

/// Instantané sérialisable de [`ServiceMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub sessions_created: u64,
    pub frames_processed: u64,
    pub active_sessions: u64,
}

impl ServiceMetrics {
    pub fn session_opened(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sessions_closed(&self, count: u64) {
        // jamais sous zéro, même si une fermeture est comptée deux fois
        let _ = self
            .active_sessions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(count))
            });
    }

    pub fn frames_processed(&self, count: u64) {
        self.frames_processed.fetch_add(count, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
        }
    }
}
