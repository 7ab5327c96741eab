use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::LogStore;

pub struct AppState {
    pub store: LogStore,
    pub public_dir: PathBuf,
    pub require_positive_qtty: bool,
    pub clock: ServerClock,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Arc<Self> {
        Arc::new(Self {
            store: LogStore::new(config.store_path(), config.store.stale_after_ms),
            public_dir: config.public_dir(),
            require_positive_qtty: config.intake.require_positive_qtty,
            clock: ServerClock::default(),
        })
    }
}

/// Wall clock in epoch milliseconds that never reports a value lower than
/// one it already handed out.
#[derive(Debug, Default)]
pub struct ServerClock {
    last: AtomicI64,
}

impl ServerClock {
    pub fn now_millis(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let prev = self.last.fetch_max(now, Ordering::SeqCst);
        prev.max(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_non_decreasing() {
        let clock = ServerClock::default();
        let mut prev = clock.now_millis();
        for _ in 0..1000 {
            let next = clock.now_millis();
            assert!(next >= prev);
            prev = next;
        }
    }

    #[test]
    fn clock_ignores_backward_steps() {
        let clock = ServerClock::default();
        let future = chrono::Utc::now().timestamp_millis() + 60_000;
        clock.last.store(future, Ordering::SeqCst);
        assert_eq!(clock.now_millis(), future);
    }
}
