//! Region connector over in-memory regions

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::debug;
use vaultpair_errors::{VaultError, VaultResult};
use vaultpair_ports::{
    Certificates, Keys, RegionConnector, ResolvedCredential, ResourceClient, Secrets,
    VaultEndpoint,
};

use crate::client::{InMemoryClient, StoredKind};
use crate::region::InMemoryRegion;

/// Connects endpoints to the registered region of the same vault name
#[derive(Default)]
pub struct InMemoryConnector {
    regions: Vec<Arc<InMemoryRegion>>,
    connects: AtomicUsize,
    credentials: Mutex<Vec<(String, String)>>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: Arc<InMemoryRegion>) -> Self {
        self.regions.push(region);
        self
    }

    /// Clients handed out so far, one per kind per region
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// `(vault, access method)` of every credential a client was built with
    pub fn credentials_used(&self) -> Vec<(String, String)> {
        self.credentials.lock().clone()
    }

    fn connect<K: StoredKind>(
        &self,
        endpoint: &VaultEndpoint,
        credential: &ResolvedCredential,
    ) -> VaultResult<Arc<dyn ResourceClient<K>>> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let region = self
            .regions
            .iter()
            .find(|region| endpoint.name.same_vault(region.name()))
            .ok_or_else(|| {
                VaultError::external_service(format!(
                    "no region is listening at {}",
                    endpoint.address
                ))
            })?;

        debug!(region = %region.address(), kind = K::NAME, method = credential.method(), "Connected");
        self.credentials.lock().push((
            credential.vault().to_string(),
            credential.method().to_string(),
        ));
        Ok(Arc::new(InMemoryClient::<K>::new(Arc::clone(region))))
    }
}

impl RegionConnector for InMemoryConnector {
    fn secrets(
        &self,
        endpoint: &VaultEndpoint,
        credential: &ResolvedCredential,
    ) -> VaultResult<Arc<dyn ResourceClient<Secrets>>> {
        self.connect::<Secrets>(endpoint, credential)
    }

    fn keys(
        &self,
        endpoint: &VaultEndpoint,
        credential: &ResolvedCredential,
    ) -> VaultResult<Arc<dyn ResourceClient<Keys>>> {
        self.connect::<Keys>(endpoint, credential)
    }

    fn certificates(
        &self,
        endpoint: &VaultEndpoint,
        credential: &ResolvedCredential,
    ) -> VaultResult<Arc<dyn ResourceClient<Certificates>>> {
        self.connect::<Certificates>(endpoint, credential)
    }
}
