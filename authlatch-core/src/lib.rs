//! AuthLatch Core - a single shared authorization claim with timed expiry
//!
//! One party claims authorization under a name; the claim lapses after a fixed
//! duration unless replaced. This crate holds that state and its timers and
//! knows nothing about HTTP.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod holder;

pub use config::LatchConfig;
pub use error::{LatchError, Result};
pub use holder::{AuthorizationHolder, AuthorizationStatus, ExpiryMode};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
