//! Leak diagnostics
//!
//! A connection dropped while still open reports itself through a
//! [`LeakHook`] before being force-closed.

use std::fmt;
use std::sync::Arc;

/// Callback receiving the identifier of a leaked connection
#[derive(Clone)]
pub struct LeakHook(Arc<dyn Fn(&str) + Send + Sync>);

impl LeakHook {
    pub fn new(hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self(Arc::new(hook))
    }

    /// Hook that ignores leaks
    pub fn silent() -> Self {
        Self::new(|_| {})
    }

    pub fn notify(&self, debug_id: &str) {
        (self.0)(debug_id)
    }
}

impl Default for LeakHook {
    /// Logs a warning
    fn default() -> Self {
        Self::new(|debug_id| {
            tracing::warn!("connection \"{}\" was dropped without being closed", debug_id);
        })
    }
}

impl fmt::Debug for LeakHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LeakHook(..)")
    }
}
