//! Per-object requeue delays
//!
//! Each queued object gets its own `kube::runtime` [`DefaultBackoff`]
//! (jittered exponential, 800 ms growing to 30 s). A success resets it, and
//! it is dropped once the object is gone.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use backoff::backoff::Backoff;
use kube::runtime::watcher::DefaultBackoff;

#[derive(Default)]
pub struct RequeueBackoff {
    objects: Mutex<HashMap<String, DefaultBackoff>>,
}

impl RequeueBackoff {
    /// Record a failure for `key` and return how long to wait before retrying.
    /// `None` means the backoff gave up.
    pub fn next_delay(&self, key: &str) -> Option<Duration> {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key.to_string())
            .or_default()
            .next_backoff()
    }

    /// Start `key` over from the initial delay
    pub fn reset(&self, key: &str) {
        if let Some(backoff) = self
            .objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(key)
        {
            backoff.reset();
        }
    }

    /// Drop all state for `key`
    pub fn forget(&self, key: &str) {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    pub fn is_tracked(&self, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }
}
