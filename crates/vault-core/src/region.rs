//! Failover reads and fan-out writes over one or two regional clients

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, error, info, warn};
use vaultpair_errors::{AttemptFailure, VaultError, VaultResult};
use vaultpair_ports::{DeleteStatus, DeletedRecord, PendingDelete, ResourceClient, ResourceKind};
use vaultpair_telemetry::{READ_FAILOVER_TOTAL, REGION_FAILURE_TOTAL, WRITE_DIVERGENCE_TOTAL};

/// Primary and optional secondary client for one resource kind.
///
/// Holds no mutable state: every primitive is a function of the operation it
/// is given and the fixed client list.
pub struct RegionClientSet<K: ResourceKind> {
    clients: Vec<Arc<dyn ResourceClient<K>>>,
}

impl<K: ResourceKind> RegionClientSet<K> {
    pub fn new(
        primary: Arc<dyn ResourceClient<K>>,
        secondary: Option<Arc<dyn ResourceClient<K>>>,
    ) -> Self {
        let mut clients = vec![primary];
        clients.extend(secondary);
        Self { clients }
    }

    /// Clients in configured order, primary first
    pub fn from_clients(clients: Vec<Arc<dyn ResourceClient<K>>>) -> VaultResult<Self> {
        if !(1..=2).contains(&clients.len()) {
            return Err(VaultError::configuration(format!(
                "A {} client set needs 1 or 2 regional clients, got {}",
                K::NAME,
                clients.len()
            )));
        }
        Ok(Self { clients })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Always false once constructed; a set holds at least the primary.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn has_secondary(&self) -> bool {
        self.clients.len() == 2
    }

    pub fn regions(&self) -> &[Arc<dyn ResourceClient<K>>] {
        &self.clients
    }

    pub fn region(&self, index: usize) -> VaultResult<&Arc<dyn ResourceClient<K>>> {
        self.clients
            .get(index)
            .ok_or(VaultError::RegionIndexOutOfRange {
                index,
                configured: self.clients.len(),
            })
    }

    /// Tries the primary, then the secondary on ANY primary error, not-found
    /// included. Each region is tried at most once.
    pub async fn read_with_failover<T, F, Fut>(
        &self,
        operation: &'static str,
        resource: &str,
        op: F,
    ) -> VaultResult<T>
    where
        F: Fn(Arc<dyn ResourceClient<K>>) -> Fut,
        Fut: Future<Output = VaultResult<T>>,
    {
        let mut attempts = Vec::with_capacity(self.clients.len());

        for (index, client) in self.clients.iter().enumerate() {
            debug!(kind = K::NAME, operation, resource, region = client.vault_uri(), "Reading from region");

            match op(Arc::clone(client)).await {
                Ok(value) => {
                    if index > 0 {
                        metrics::counter!(READ_FAILOVER_TOTAL, "kind" => K::NAME).increment(1);
                        info!(
                            kind = K::NAME,
                            operation,
                            resource,
                            region = client.vault_uri(),
                            "Read served by secondary region"
                        );
                    }
                    return Ok(value);
                }
                Err(e) => {
                    metrics::counter!(REGION_FAILURE_TOTAL, "kind" => K::NAME, "operation" => operation)
                        .increment(1);
                    warn!(
                        kind = K::NAME,
                        operation,
                        resource,
                        region = client.vault_uri(),
                        error = %e,
                        "Regional read failed"
                    );
                    attempts.push(AttemptFailure::new(client.vault_uri(), e));
                }
            }
        }

        error!(kind = K::NAME, operation, resource, "Read failed in every region");
        Err(VaultError::RegionAccess {
            operation: operation.to_string(),
            resource: resource.to_string(),
            attempts,
        })
    }

    /// Runs `op` against every region concurrently and returns the primary's
    /// result only if every region accepted the write.
    pub async fn fan_out_write<T, F, Fut>(
        &self,
        operation: &'static str,
        resource: &str,
        op: F,
    ) -> VaultResult<T>
    where
        F: Fn(Arc<dyn ResourceClient<K>>) -> Fut,
        Fut: Future<Output = VaultResult<T>>,
    {
        self.fan_out(operation, resource, op).await
    }

    /// Starts the delete in every region concurrently, then waits for the
    /// primary's delete/purge-schedule operation to finish.
    ///
    /// The secondary must accept the delete for the call to succeed, but its
    /// pending operation is released unawaited and only the primary's deleted
    /// record is returned.
    pub async fn fan_out_delete<F, Fut>(
        &self,
        resource: &str,
        poll_interval: Duration,
        op: F,
    ) -> VaultResult<DeletedRecord<K::Record>>
    where
        F: Fn(Arc<dyn ResourceClient<K>>) -> Fut,
        Fut: Future<Output = VaultResult<Box<dyn PendingDelete<K::Record>>>>,
    {
        let primary = self.fan_out("delete", resource, op).await?;

        match wait_for_completion(primary, poll_interval).await {
            Ok(deleted) => Ok(deleted),
            Err(e) => {
                let region = self.clients[0].vault_uri();
                metrics::counter!(WRITE_DIVERGENCE_TOTAL, "kind" => K::NAME).increment(1);
                error!(kind = K::NAME, resource, region, error = %e, "Primary delete did not complete");
                Err(VaultError::WriteConsistency {
                    operation: "delete".to_string(),
                    resource: resource.to_string(),
                    failures: vec![AttemptFailure::new(region, e)],
                    succeeded: self.clients[1..]
                        .iter()
                        .map(|c| c.vault_uri().to_string())
                        .collect(),
                })
            }
        }
    }

    async fn fan_out<T, F, Fut>(
        &self,
        operation: &'static str,
        resource: &str,
        op: F,
    ) -> VaultResult<T>
    where
        F: Fn(Arc<dyn ResourceClient<K>>) -> Fut,
        Fut: Future<Output = VaultResult<T>>,
    {
        let mut in_flight: FuturesUnordered<_> = self
            .clients
            .iter()
            .enumerate()
            .map(|(index, client)| {
                let call = op(Arc::clone(client));
                async move { (index, call.await) }
            })
            .collect();

        let mut primary = None;
        let mut failures = Vec::new();
        let mut succeeded = Vec::new();

        // Failures are recorded in the order they are observed.
        while let Some((index, outcome)) = in_flight.next().await {
            let region = self.clients[index].vault_uri();
            match outcome {
                Ok(value) => {
                    debug!(kind = K::NAME, operation, resource, region, "Region accepted write");
                    succeeded.push(region.to_string());
                    if index == 0 {
                        primary = Some(value);
                    }
                }
                Err(e) => {
                    metrics::counter!(REGION_FAILURE_TOTAL, "kind" => K::NAME, "operation" => operation)
                        .increment(1);
                    warn!(kind = K::NAME, operation, resource, region, error = %e, "Region rejected write");
                    failures.push(AttemptFailure::new(region, e));
                }
            }
        }

        match primary {
            Some(value) if failures.is_empty() => Ok(value),
            _ => {
                metrics::counter!(WRITE_DIVERGENCE_TOTAL, "kind" => K::NAME).increment(1);
                error!(
                    kind = K::NAME,
                    operation,
                    resource,
                    failed = failures.len(),
                    accepted = succeeded.len(),
                    "Write did not succeed in every region"
                );
                Err(VaultError::WriteConsistency {
                    operation: operation.to_string(),
                    resource: resource.to_string(),
                    failures,
                    succeeded,
                })
            }
        }
    }
}

async fn wait_for_completion<R: Send>(
    mut operation: Box<dyn PendingDelete<R>>,
    poll_interval: Duration,
) -> VaultResult<DeletedRecord<R>> {
    loop {
        match operation.poll().await? {
            DeleteStatus::Completed(deleted) => return Ok(deleted),
            DeleteStatus::Pending => tokio::time::sleep(poll_interval).await,
        }
    }
}
