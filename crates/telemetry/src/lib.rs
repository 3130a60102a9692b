//! vaultpair-telemetry - observability
//!
//! Subscriber setup, the Prometheus recorder, the metric names recorded by the
//! region orchestration, and the health aggregate.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vaultpair_config::TelemetryConfig;

/// Reads served by the secondary region after the primary failed
pub const READ_FAILOVER_TOTAL: &str = "vaultpair_read_failover_total";
/// Individual regional call failures
pub const REGION_FAILURE_TOTAL: &str = "vaultpair_region_failure_total";
/// Fan-out writes/deletes rejected by at least one region
pub const WRITE_DIVERGENCE_TOTAL: &str = "vaultpair_write_divergence_total";

/// Initialize tracing
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize JSON tracing (production)
pub fn init_tracing_json(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Initialize tracing from settings
pub fn init_from_config(config: &TelemetryConfig) {
    if config.json {
        init_tracing_json(&config.log_level);
    } else {
        init_tracing(&config.log_level);
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

/// Register descriptions for the counters recorded by the facade
pub fn describe_metrics() {
    metrics::describe_counter!(
        READ_FAILOVER_TOTAL,
        "Reads served by the secondary region after the primary failed"
    );
    metrics::describe_counter!(REGION_FAILURE_TOTAL, "Failed calls to a single region");
    metrics::describe_counter!(
        WRITE_DIVERGENCE_TOTAL,
        "Writes or deletes not accepted by every region"
    );
}

/// Health status
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub checks: Vec<HealthCheck>,
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub name: String,
    pub healthy: bool,
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self {
            healthy: true,
            checks: Vec::new(),
        }
    }

    pub fn add_check(&mut self, name: impl Into<String>, healthy: bool, message: Option<String>) {
        if !healthy {
            self.healthy = false;
        }
        self.checks.push(HealthCheck {
            name: name.into(),
            healthy,
            message,
        });
    }

    /// Healthy checks
    pub fn healthy_count(&self) -> usize {
        self.checks.iter().filter(|c| c.healthy).count()
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_status_is_healthy() {
        let status = HealthStatus::default();
        assert!(status.healthy);
        assert_eq!(status.healthy_count(), 0);
    }

    #[test]
    fn test_one_failed_check_marks_unhealthy() {
        let mut status = HealthStatus::new();
        status.add_check("https://east.vault.azure.net/", true, None);
        status.add_check(
            "https://west.vault.azure.net/",
            false,
            Some("connection refused".to_string()),
        );

        assert!(!status.healthy);
        assert_eq!(status.checks.len(), 2);
        assert_eq!(status.healthy_count(), 1);
    }
}
