//! Trailing-edge debouncing.
//!
//! Each call schedules its action after the delay; a newer call made before
//! that delay runs out takes its place. Only the last call of a burst runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedule `action`, superseding any call still waiting.
    ///
    /// Outside a tokio runtime there is nothing to wait on, so `action` runs
    /// at once and `None` is returned.
    pub fn call<F>(&self, action: F) -> Option<JoinHandle<bool>>
    where
        F: FnOnce() + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let Ok(handle) = Handle::try_current() else {
            debug!("no runtime, running debounced action immediately");
            action();
            return None;
        };
        let latest = Arc::clone(&self.generation);
        let delay = self.delay;
        Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if latest.load(Ordering::SeqCst) != generation {
                return false;
            }
            action();
            true
        }))
    }
}
