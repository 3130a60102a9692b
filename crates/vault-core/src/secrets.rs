//! Secret operations

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use vaultpair_errors::VaultResult;
use vaultpair_ports::{DeletedRecord, ResourceProperties, SecretRecord, Tags};

use crate::facade::VaultFacade;
use crate::paging::ListProgress;

impl VaultFacade {
    /// Reads a secret from the primary, falling back to the secondary.
    ///
    /// `version` selects a specific version; `None` reads the latest.
    pub async fn get_secret(
        &self,
        name: &str,
        version: Option<&str>,
        cancel: &CancellationToken,
    ) -> VaultResult<SecretRecord> {
        self.get_resource(&self.secrets, name, version, cancel).await
    }

    /// Writes a secret to every region.
    ///
    /// The stored tags are `tags` plus the value's fingerprint and the
    /// authenticated principal.
    pub async fn set_secret(
        &self,
        name: &str,
        value: &SecretString,
        tags: Option<Tags>,
        content_type: Option<String>,
        cancel: &CancellationToken,
    ) -> VaultResult<SecretRecord> {
        self.set_resource(&self.secrets, name, value, tags, content_type, cancel)
            .await
    }

    /// Every secret's properties in one region, values excluded
    pub async fn list_secrets(
        &self,
        region_index: usize,
        on_progress: Option<ListProgress<'_>>,
        cancel: &CancellationToken,
    ) -> VaultResult<Vec<ResourceProperties>> {
        self.list_resources(&self.secrets, region_index, on_progress, cancel)
            .await
    }

    pub async fn list_secret_versions(
        &self,
        name: &str,
        region_index: usize,
        cancel: &CancellationToken,
    ) -> VaultResult<Vec<ResourceProperties>> {
        self.list_versions(&self.secrets, name, region_index, cancel)
            .await
    }

    /// Deletes a secret in every region and waits for the primary's delete
    /// to complete.
    pub async fn delete_secret(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> VaultResult<DeletedRecord<SecretRecord>> {
        self.delete_resource(&self.secrets, name, cancel).await
    }
}
