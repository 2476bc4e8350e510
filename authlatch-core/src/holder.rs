//! Authorization state holder with timed expiry
//!
//! The holder owns a single claimant slot. Every successful claim overwrites
//! the slot and schedules an expiry timer on the tokio runtime; what happens to
//! timers scheduled by earlier claims depends on the [`ExpiryMode`].

use crate::config::{LatchConfig, DEFAULT_AUTH_TIMEOUT};
use crate::error::{LatchError, Result};
use metrics::{counter, gauge};
use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// How expiry timers from superseded claims are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExpiryMode {
    /// Only the most recent claim's timer may clear the state. Earlier timers
    /// are aborted when a new claim arrives.
    #[default]
    LatestOnly,
    /// Every timer stays live and clears whatever claim is active when it
    /// fires, so an old timer can end a newer claim early.
    Uncancelled,
}

impl ExpiryMode {
    /// Stable name used in configuration, logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryMode::LatestOnly => "latest",
            ExpiryMode::Uncancelled => "uncancelled",
        }
    }
}

impl fmt::Display for ExpiryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpiryMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latest" | "latest-only" | "latest_only" => Ok(ExpiryMode::LatestOnly),
            "uncancelled" | "legacy" => Ok(ExpiryMode::Uncancelled),
            other => Err(format!(
                "unknown expiry mode '{}' (expected 'latest' or 'uncancelled')",
                other
            )),
        }
    }
}

/// Result of querying the holder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// No claim is active
    Unauthorized,
    /// A claim is active
    Authorized {
        /// The claimant
        name: String,
    },
}

impl AuthorizationStatus {
    /// Whether a claim is active
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthorizationStatus::Authorized { .. })
    }

    /// The active claimant, if any
    pub fn claimant(&self) -> Option<&str> {
        match self {
            AuthorizationStatus::Authorized { name } => Some(name),
            AuthorizationStatus::Unauthorized => None,
        }
    }
}

#[derive(Debug, Default)]
struct LatchState {
    authorized_by: Option<String>,
    /// Bumped on every claim; a timer only clears the claim it was scheduled
    /// for when running in `LatestOnly` mode.
    generation: u64,
    timers: Vec<JoinHandle<()>>,
}

/// Holds the current claimant and enforces timed expiry
///
/// Claims must be made from within a tokio runtime, since each one spawns its
/// expiry timer as a task.
#[derive(Debug)]
pub struct AuthorizationHolder {
    state: Arc<Mutex<LatchState>>,
    timeout: Duration,
    mode: ExpiryMode,
}

impl Default for AuthorizationHolder {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_TIMEOUT, ExpiryMode::default())
    }
}

impl AuthorizationHolder {
    /// Create an unauthorized holder
    pub fn new(timeout: Duration, mode: ExpiryMode) -> Self {
        AuthorizationHolder {
            state: Arc::new(Mutex::new(LatchState::default())),
            timeout,
            mode,
        }
    }

    /// Create a holder from runtime configuration
    pub fn from_config(config: &LatchConfig) -> Self {
        Self::new(config.auth_timeout, config.expiry_mode)
    }

    /// How long a claim stays active
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Timer handling mode
    pub fn mode(&self) -> ExpiryMode {
        self.mode
    }

    /// Record `name` as the claimant, replacing any existing claim
    ///
    /// Fails with [`LatchError::InvalidArgument`] for an empty name and leaves
    /// the current state untouched.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn claim(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(LatchError::InvalidArgument("name is required".to_string()));
        }

        let mut state = self.state.lock();
        state.timers.retain(|timer| !timer.is_finished());

        if self.mode == ExpiryMode::LatestOnly {
            for timer in state.timers.drain(..) {
                timer.abort();
            }
        }

        state.generation = state.generation.wrapping_add(1);
        let previous = state.authorized_by.replace(name.to_string());

        let timer = tokio::spawn(expire_after(
            Arc::downgrade(&self.state),
            Instant::now() + self.timeout,
            state.generation,
            self.mode,
        ));
        state.timers.push(timer);

        gauge!("authlatch_authorized").set(1.0);
        info!(
            claimant = %name,
            replaced = previous.is_some(),
            expires_in_ms = self.timeout.as_millis() as u64,
            "Authorization claimed"
        );

        Ok(())
    }

    /// Current authorization state
    pub fn query(&self) -> AuthorizationStatus {
        let state = self.state.lock();
        match &state.authorized_by {
            Some(name) => AuthorizationStatus::Authorized { name: name.clone() },
            None => AuthorizationStatus::Unauthorized,
        }
    }

    /// Current claimant, or [`LatchError::NotAuthorized`]
    pub fn require(&self) -> Result<String> {
        match self.query() {
            AuthorizationStatus::Authorized { name } => Ok(name),
            AuthorizationStatus::Unauthorized => Err(LatchError::NotAuthorized),
        }
    }

    /// Number of expiry timers that have not fired or been aborted yet
    pub fn pending_timers(&self) -> usize {
        self.state
            .lock()
            .timers
            .iter()
            .filter(|timer| !timer.is_finished())
            .count()
    }
}

impl Drop for AuthorizationHolder {
    fn drop(&mut self) {
        for timer in self.state.lock().timers.drain(..) {
            timer.abort();
        }
    }
}

async fn expire_after(
    state: Weak<Mutex<LatchState>>,
    deadline: Instant,
    generation: u64,
    mode: ExpiryMode,
) {
    tokio::time::sleep_until(deadline).await;

    let Some(state) = state.upgrade() else {
        return;
    };
    let mut state = state.lock();

    if mode == ExpiryMode::LatestOnly && state.generation != generation {
        debug!(generation, current = state.generation, "Superseded expiry timer skipped");
        return;
    }

    if let Some(name) = state.authorized_by.take() {
        counter!("authlatch_expirations_total", "mode" => mode.as_str()).increment(1);
        gauge!("authlatch_authorized").set(0.0);
        info!(claimant = %name, mode = %mode, "Authorization expired");
    }
}
