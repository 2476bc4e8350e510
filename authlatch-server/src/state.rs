//! Application state

use authlatch_core::{AuthorizationHolder, LatchConfig};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The authorization state holder
    pub holder: Arc<AuthorizationHolder>,

    /// Server start time
    pub start_time: Instant,

    /// Debug mode flag
    pub debug: bool,
}

impl AppState {
    /// Create new application state
    pub fn new(holder: Arc<AuthorizationHolder>) -> Self {
        Self::with_debug(holder, false)
    }

    /// Create application state with debug mode
    pub fn with_debug(holder: Arc<AuthorizationHolder>, debug: bool) -> Self {
        Self {
            holder,
            start_time: Instant::now(),
            debug,
        }
    }

    /// Build the holder described by `config`
    pub fn from_config(config: &LatchConfig) -> Self {
        Self::with_debug(
            Arc::new(AuthorizationHolder::from_config(config)),
            config.debug,
        )
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
