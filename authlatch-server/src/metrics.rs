//! Prometheus metrics collection for the AuthLatch server

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{info, warn};

/// Initialize all metric descriptions
pub fn init_metrics() {
    // Counters
    describe_counter!("authlatch_claims_total", "Total number of claim requests by outcome");
    describe_counter!("authlatch_queries_total", "Total number of query requests by outcome");
    describe_counter!("authlatch_expirations_total", "Total number of claims cleared by an expiry timer");

    // Histograms
    describe_histogram!("authlatch_request_latency_seconds", "Handler latency in seconds");

    // Gauges
    describe_gauge!("authlatch_authorized", "1 while a claim is active, 0 otherwise");
}

/// Record a claim request
pub fn record_claim(outcome: &'static str) {
    counter!("authlatch_claims_total", "outcome" => outcome).increment(1);
}

/// Record a query request
pub fn record_query(outcome: &'static str) {
    counter!("authlatch_queries_total", "outcome" => outcome).increment(1);
}

/// Timer for measuring handler latency
pub struct LatencyTimer {
    start: Instant,
    operation: &'static str,
}

impl LatencyTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }

    pub fn record(self) {
        let elapsed = self.start.elapsed().as_secs_f64();
        histogram!("authlatch_request_latency_seconds", "operation" => self.operation).record(elapsed);
    }
}

/// Storage for Prometheus handle
static PROMETHEUS_HANDLE: std::sync::OnceLock<PrometheusHandle> = std::sync::OnceLock::new();

/// Install the Prometheus recorder
///
/// With `listen` set, the exporter's own HTTP listener serves scrapes on that
/// address; it must be called from within a tokio runtime in that case.
pub fn init_prometheus(listen: Option<SocketAddr>) -> anyhow::Result<()> {
    let handle = match listen {
        Some(addr) => {
            let (recorder, exporter) = PrometheusBuilder::new().with_http_listener(addr).build()?;
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder)
                .map_err(|_| anyhow::anyhow!("Failed to install metrics recorder"))?;
            tokio::spawn(async move {
                if let Err(e) = exporter.await {
                    warn!("Prometheus exporter stopped: {:?}", e);
                }
            });
            info!("Serving Prometheus metrics on {}", addr);
            handle
        }
        None => PrometheusBuilder::new().install_recorder()?,
    };

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("Failed to set Prometheus handle"))?;
    Ok(())
}

/// Get Prometheus metrics string
pub fn get_prometheus_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Prometheus metrics not initialized\n".to_string())
}
