//! Adapter configuration

use std::time::Duration;

/// Configuration for the save orchestrator
#[derive(Debug, Clone, Default)]
pub struct AdapterConfig {
    /// Coalescing window for rapid successive saves
    ///
    /// `None` transmits every save immediately, the deterministic
    /// mode test suites run in. When set, a save inside the window
    /// replaces the pending entry for its record and extends the
    /// deadline; one patch goes out per record per flush, recomputed
    /// from current values.
    pub flush_delay: Option<Duration>,
}

impl AdapterConfig {
    /// Configuration with a coalescing window
    pub fn with_flush_delay(delay: Duration) -> Self {
        AdapterConfig {
            flush_delay: Some(delay),
        }
    }
}
