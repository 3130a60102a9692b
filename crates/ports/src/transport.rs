//! Regional transport traits

use std::sync::Arc;

use async_trait::async_trait;
use vaultpair_errors::VaultResult;

use crate::identity::ResolvedCredential;
use crate::kind::{Certificates, Keys, ResourceKind, Secrets};
use crate::model::{DeletedRecord, Page, ResourceProperties, VaultEndpoint, WriteProperties};

/// State of a started delete
#[derive(Debug)]
pub enum DeleteStatus<R> {
    Pending,
    Completed(DeletedRecord<R>),
}

/// Long-running delete/purge-schedule operation
#[async_trait]
pub trait PendingDelete<R: Send>: Send {
    /// Query the backend once
    async fn poll(&mut self) -> VaultResult<DeleteStatus<R>>;
}

/// Client for one resource kind in one region
#[async_trait]
pub trait ResourceClient<K: ResourceKind>: Send + Sync {
    /// Identity of the region, used in aggregate errors and logs
    fn vault_uri(&self) -> &str;

    /// Latest version when `version` is `None`
    async fn get(&self, name: &str, version: Option<&str>) -> VaultResult<K::Record>;

    async fn set(
        &self,
        name: &str,
        value: &K::Value,
        properties: &WriteProperties,
    ) -> VaultResult<K::Record>;

    async fn list_properties(
        &self,
        continuation: Option<String>,
    ) -> VaultResult<Page<ResourceProperties>>;

    async fn list_property_versions(
        &self,
        name: &str,
        continuation: Option<String>,
    ) -> VaultResult<Page<ResourceProperties>>;

    async fn start_delete(&self, name: &str) -> VaultResult<Box<dyn PendingDelete<K::Record>>>;
}

/// Builds the per-kind clients of one region
pub trait RegionConnector: Send + Sync {
    fn secrets(
        &self,
        endpoint: &VaultEndpoint,
        credential: &ResolvedCredential,
    ) -> VaultResult<Arc<dyn ResourceClient<Secrets>>>;

    fn keys(
        &self,
        endpoint: &VaultEndpoint,
        credential: &ResolvedCredential,
    ) -> VaultResult<Arc<dyn ResourceClient<Keys>>>;

    fn certificates(
        &self,
        endpoint: &VaultEndpoint,
        credential: &ResolvedCredential,
    ) -> VaultResult<Arc<dyn ResourceClient<Certificates>>>;
}
