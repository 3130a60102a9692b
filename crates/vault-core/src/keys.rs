//! Key operations

use tokio_util::sync::CancellationToken;
use vaultpair_errors::VaultResult;
use vaultpair_ports::{DeletedRecord, JsonWebKey, KeyRecord, ResourceProperties, Tags};

use crate::facade::VaultFacade;
use crate::paging::ListProgress;

impl VaultFacade {
    pub async fn get_key(
        &self,
        name: &str,
        version: Option<&str>,
        cancel: &CancellationToken,
    ) -> VaultResult<KeyRecord> {
        self.get_resource(&self.keys, name, version, cancel).await
    }

    /// Imports key material into every region. Keys carry no content type.
    pub async fn set_key(
        &self,
        name: &str,
        key: &JsonWebKey,
        tags: Option<Tags>,
        cancel: &CancellationToken,
    ) -> VaultResult<KeyRecord> {
        self.set_resource(&self.keys, name, key, tags, None, cancel)
            .await
    }

    pub async fn list_keys(
        &self,
        region_index: usize,
        on_progress: Option<ListProgress<'_>>,
        cancel: &CancellationToken,
    ) -> VaultResult<Vec<ResourceProperties>> {
        self.list_resources(&self.keys, region_index, on_progress, cancel)
            .await
    }

    pub async fn list_key_versions(
        &self,
        name: &str,
        region_index: usize,
        cancel: &CancellationToken,
    ) -> VaultResult<Vec<ResourceProperties>> {
        self.list_versions(&self.keys, name, region_index, cancel)
            .await
    }

    pub async fn delete_key(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> VaultResult<DeletedRecord<KeyRecord>> {
        self.delete_resource(&self.keys, name, cancel).await
    }
}
