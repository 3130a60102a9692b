//! Per-region health probing

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vaultpair_errors::VaultResult;
use vaultpair_ports::{ResourceClient, Secrets};
use vaultpair_telemetry::HealthStatus;

use crate::cancel::cancellable;
use crate::facade::VaultFacade;

/// Secret name read by the probe. It is not expected to exist.
pub const HEALTH_PROBE_NAME: &str = "health-check-probe";

/// Health check result for one region
#[derive(Debug, Clone)]
pub struct RegionHealth {
    pub region: String,

    /// Whether the region answered the probe
    pub accessible: bool,

    /// Response time in milliseconds
    pub response_time_ms: Option<u64>,

    /// Error message if the probe failed
    pub error: Option<String>,
}

impl RegionHealth {
    pub fn healthy(region: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            region: region.into(),
            accessible: true,
            response_time_ms: Some(response_time_ms),
            error: None,
        }
    }

    pub fn unhealthy(region: impl Into<String>, error: String) -> Self {
        Self {
            region: region.into(),
            accessible: false,
            response_time_ms: None,
            error: Some(error),
        }
    }
}

async fn probe(client: Arc<dyn ResourceClient<Secrets>>) -> RegionHealth {
    let region = client.vault_uri().to_string();
    debug!(region = %region, "Probing region");

    let start = Instant::now();
    match client.get(HEALTH_PROBE_NAME, None).await {
        Ok(_) => RegionHealth::healthy(region, start.elapsed().as_millis() as u64),
        // An answer of "not found" still proves the region is reachable.
        Err(e) if e.is_not_found() => {
            RegionHealth::healthy(region, start.elapsed().as_millis() as u64)
        }
        Err(e) => {
            warn!(region = %region, error = %e, "Region health probe failed");
            RegionHealth::unhealthy(region, e.to_string())
        }
    }
}

impl VaultFacade {
    /// Probes every configured region concurrently, primary first in the result.
    pub async fn check_health(&self, cancel: &CancellationToken) -> VaultResult<Vec<RegionHealth>> {
        let probes = self
            .secrets
            .regions()
            .iter()
            .map(|client| probe(Arc::clone(client)));

        cancellable(cancel, async { Ok(join_all(probes).await) }).await
    }
}

/// Folds region results into the aggregate health report
pub fn health_status(regions: &[RegionHealth]) -> HealthStatus {
    let mut status = HealthStatus::new();
    for region in regions {
        status.add_check(region.region.clone(), region.accessible, region.error.clone());
    }
    status
}
