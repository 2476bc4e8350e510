//! Runtime configuration read from the process environment

use crate::error::{LatchError, Result};
use crate::holder::ExpiryMode;
use std::net::SocketAddr;
use std::time::Duration;

/// Default listening port
pub const DEFAULT_PORT: u16 = 3000;

/// Default time a claim stays active
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_millis(7000);

/// Default OTLP collector endpoint (gRPC)
pub const DEFAULT_OTEL_ENDPOINT: &str = "http://localhost:4317";

/// Server and holder configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LatchConfig {
    /// Address to bind the HTTP listener to
    pub host: String,
    /// Port to bind the HTTP listener to
    pub port: u16,
    /// How long a claim stays active
    pub auth_timeout: Duration,
    /// How superseded expiry timers are handled
    pub expiry_mode: ExpiryMode,
    /// Log claimant names and holder internals
    pub debug: bool,
    /// Export traces over OTLP
    pub otel_enabled: bool,
    /// OTLP collector the trace exporter sends to
    pub otel_endpoint: String,
    /// Fraction of traces sampled, 1.0 keeps all of them
    pub trace_sample_rate: f64,
    /// Separate listener for Prometheus scrapes
    pub metrics_address: Option<SocketAddr>,
}

impl Default for LatchConfig {
    fn default() -> Self {
        LatchConfig {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            expiry_mode: ExpiryMode::default(),
            debug: false,
            otel_enabled: false,
            otel_endpoint: DEFAULT_OTEL_ENDPOINT.to_string(),
            trace_sample_rate: 1.0,
            metrics_address: None,
        }
    }
}

impl LatchConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Unset variables keep their defaults; set but unparseable ones are an
    /// error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LatchConfig::default();

        if let Some(host) = lookup("HOST") {
            if host.trim().is_empty() {
                return Err(LatchError::ConfigError("HOST must not be empty".to_string()));
            }
            config.host = host.trim().to_string();
        }

        if let Some(port) = lookup("PORT") {
            config.port = parse_var("PORT", &port)?;
        }

        if let Some(timeout) = lookup("AUTH_TIMEOUT_MS") {
            let millis: u64 = parse_var("AUTH_TIMEOUT_MS", &timeout)?;
            if millis == 0 {
                return Err(LatchError::ConfigError(
                    "AUTH_TIMEOUT_MS must be greater than zero".to_string(),
                ));
            }
            config.auth_timeout = Duration::from_millis(millis);
        }

        if let Some(mode) = lookup("EXPIRY_MODE") {
            config.expiry_mode = parse_var("EXPIRY_MODE", &mode)?;
        }

        config.debug = lookup("DEBUG").is_some();

        if let Some(otel) = lookup("OTEL_ENABLED") {
            config.otel_enabled = parse_var("OTEL_ENABLED", &otel)?;
        }

        if let Some(endpoint) = lookup("OTEL_EXPORTER_OTLP_ENDPOINT") {
            config.otel_endpoint = endpoint.trim().to_string();
        }

        if let Some(rate) = lookup("OTEL_TRACES_SAMPLER_ARG") {
            let rate: f64 = parse_var("OTEL_TRACES_SAMPLER_ARG", &rate)?;
            if !rate.is_finite() {
                return Err(LatchError::ConfigError(
                    "OTEL_TRACES_SAMPLER_ARG must be a finite number".to_string(),
                ));
            }
            config.trace_sample_rate = rate;
        }

        if let Some(addr) = lookup("METRICS_ADDRESS") {
            config.metrics_address = Some(parse_var("METRICS_ADDRESS", &addr)?);
        }

        Ok(config)
    }

    /// `host:port` string suitable for `TcpListener::bind`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| LatchError::ConfigError(format!("{} has invalid value {:?}: {}", key, raw, e)))
}
