//! Resource clients over an in-memory region

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use vaultpair_common::new_version_id;
use vaultpair_errors::{VaultError, VaultResult};
use vaultpair_ports::{
    Attributes, CertificateImport, CertificateRecord, Certificates, DeleteStatus, DeletedRecord,
    JsonWebKey, KeyRecord, Keys, Page, PendingDelete, ResourceClient, ResourceKind,
    ResourceProperties, SecretRecord, Secrets, WriteProperties,
};

use crate::region::{Access, InMemoryRegion, RecordStore, RegionState};

/// Days a soft-deleted record is retained before purge
const RETENTION_DAYS: i64 = 90;

/// How a resource kind is stored in a region
pub trait StoredKind: ResourceKind<Record: Clone> {
    /// Path segment of record identifiers
    const COLLECTION: &'static str;

    fn store(state: &mut RegionState) -> &mut RecordStore<Self::Record>;

    /// Record as the backend would return it after a write
    fn build(
        address: &str,
        name: &str,
        value: &Self::Value,
        properties: &WriteProperties,
    ) -> Self::Record;

    fn properties(record: &Self::Record) -> ResourceProperties;
}

fn record_id(address: &str, collection: &str, name: &str, version: &str) -> String {
    format!("{}{}/{}/{}", address, collection, name, version)
}

fn fresh_attributes() -> Attributes {
    let now = Utc::now();
    Attributes {
        enabled: Some(true),
        created: Some(now),
        updated: Some(now),
        recovery_level: Some("Recoverable+Purgeable".to_string()),
        ..Default::default()
    }
}

impl StoredKind for Secrets {
    const COLLECTION: &'static str = "secrets";

    fn store(state: &mut RegionState) -> &mut RecordStore<SecretRecord> {
        &mut state.secrets
    }

    fn build(
        address: &str,
        name: &str,
        value: &Self::Value,
        properties: &WriteProperties,
    ) -> SecretRecord {
        let version = new_version_id();
        SecretRecord {
            id: record_id(address, Self::COLLECTION, name, &version),
            name: name.to_string(),
            version: Some(version),
            value: value.clone(),
            content_type: properties.content_type.clone(),
            attributes: fresh_attributes(),
            tags: properties.tags.clone(),
        }
    }

    fn properties(record: &SecretRecord) -> ResourceProperties {
        ResourceProperties {
            id: record.id.clone(),
            name: record.name.clone(),
            version: record.version.clone(),
            content_type: record.content_type.clone(),
            attributes: record.attributes.clone(),
            tags: record.tags.clone(),
        }
    }
}

impl StoredKind for Keys {
    const COLLECTION: &'static str = "keys";

    fn store(state: &mut RegionState) -> &mut RecordStore<KeyRecord> {
        &mut state.keys
    }

    fn build(
        address: &str,
        name: &str,
        value: &JsonWebKey,
        properties: &WriteProperties,
    ) -> KeyRecord {
        let version = new_version_id();
        let id = record_id(address, Self::COLLECTION, name, &version);
        // Private members are never released back to callers.
        let key = JsonWebKey {
            kid: Some(id.clone()),
            d: None,
            dp: None,
            dq: None,
            qi: None,
            p: None,
            q: None,
            k: None,
            t: None,
            ..value.clone()
        };
        KeyRecord {
            id,
            name: name.to_string(),
            version: Some(version),
            key,
            attributes: fresh_attributes(),
            tags: properties.tags.clone(),
        }
    }

    fn properties(record: &KeyRecord) -> ResourceProperties {
        ResourceProperties {
            id: record.id.clone(),
            name: record.name.clone(),
            version: record.version.clone(),
            content_type: None,
            attributes: record.attributes.clone(),
            tags: record.tags.clone(),
        }
    }
}

impl StoredKind for Certificates {
    const COLLECTION: &'static str = "certificates";

    fn store(state: &mut RegionState) -> &mut RecordStore<CertificateRecord> {
        &mut state.certificates
    }

    fn build(
        address: &str,
        name: &str,
        value: &CertificateImport,
        properties: &WriteProperties,
    ) -> CertificateRecord {
        let version = new_version_id();
        let content_type = properties.content_type.clone().or_else(|| {
            value
                .policy
                .as_ref()
                .and_then(|policy| policy.content_type.clone())
        });
        CertificateRecord {
            id: record_id(address, Self::COLLECTION, name, &version),
            name: name.to_string(),
            version: Some(version),
            cer: value.certificate.clone(),
            content_type,
            attributes: fresh_attributes(),
            tags: properties.tags.clone(),
            policy: value.policy.clone(),
        }
    }

    fn properties(record: &CertificateRecord) -> ResourceProperties {
        ResourceProperties {
            id: record.id.clone(),
            name: record.name.clone(),
            version: record.version.clone(),
            content_type: record.content_type.clone(),
            attributes: record.attributes.clone(),
            tags: record.tags.clone(),
        }
    }
}

/// Client for one resource kind in an [`InMemoryRegion`]
pub struct InMemoryClient<K> {
    region: Arc<InMemoryRegion>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> InMemoryClient<K> {
    pub fn new(region: Arc<InMemoryRegion>) -> Self {
        Self {
            region,
            _kind: PhantomData,
        }
    }

    fn not_found(&self, kind: &str, name: &str) -> VaultError {
        VaultError::from_status(
            404,
            format!("{} {} was not found in {}", kind, name, self.region.address()),
        )
    }
}

fn offset(continuation: Option<String>) -> VaultResult<usize> {
    match continuation {
        None => Ok(0),
        Some(token) => token
            .parse()
            .map_err(|_| VaultError::from_status(400, format!("invalid continuation token {}", token))),
    }
}

fn page(items: Vec<ResourceProperties>, offset: usize, page_size: usize) -> Page<ResourceProperties> {
    let end = offset.saturating_add(page_size);
    let continuation = (end < items.len()).then(|| end.to_string());
    Page {
        items: items.into_iter().skip(offset).take(page_size).collect(),
        continuation,
    }
}

#[async_trait]
impl<K: StoredKind> ResourceClient<K> for InMemoryClient<K> {
    fn vault_uri(&self) -> &str {
        self.region.address()
    }

    async fn get(&self, name: &str, version: Option<&str>) -> VaultResult<K::Record> {
        self.region.enter(Access::Read).await?;

        let found = self.region.with_state(|state| {
            let store = K::store(state);
            match version {
                Some(version) => store
                    .versions(name)
                    .iter()
                    .find(|record| K::properties(record).version.as_deref() == Some(version))
                    .cloned(),
                None => store.latest(name).cloned(),
            }
        });
        found.ok_or_else(|| self.not_found(K::NAME, name))
    }

    async fn set(
        &self,
        name: &str,
        value: &K::Value,
        properties: &WriteProperties,
    ) -> VaultResult<K::Record> {
        self.region.enter(Access::Write).await?;

        self.region.with_state(|state| {
            let store = K::store(state);
            if store.is_deleted(name) {
                return Err(VaultError::from_status(
                    409,
                    format!("{} {} is deleted but recoverable", K::NAME, name),
                ));
            }
            let record = K::build(self.region.address(), name, value, properties);
            store.push(name, record.clone());
            Ok(record)
        })
    }

    async fn list_properties(
        &self,
        continuation: Option<String>,
    ) -> VaultResult<Page<ResourceProperties>> {
        self.region.enter(Access::Read).await?;
        let offset = offset(continuation)?;

        let items = self.region.with_state(|state| {
            K::store(state)
                .latest_of_each()
                .iter()
                .map(K::properties)
                .collect()
        });
        Ok(page(items, offset, self.region.page_size()))
    }

    async fn list_property_versions(
        &self,
        name: &str,
        continuation: Option<String>,
    ) -> VaultResult<Page<ResourceProperties>> {
        self.region.enter(Access::Read).await?;
        let offset = offset(continuation)?;

        let items = self.region.with_state(|state| {
            K::store(state)
                .versions(name)
                .iter()
                .map(K::properties)
                .collect()
        });
        Ok(page(items, offset, self.region.page_size()))
    }

    async fn start_delete(&self, name: &str) -> VaultResult<Box<dyn PendingDelete<K::Record>>> {
        self.region.enter(Access::Write).await?;

        let now = Utc::now();
        let address = self.region.address();
        let deleted = self.region.with_state(|state| {
            K::store(state).soft_delete(name, |record| DeletedRecord {
                record,
                recovery_id: Some(format!("{}deleted{}/{}", address, K::COLLECTION, name)),
                deleted_on: Some(now),
                scheduled_purge_date: Some(now + chrono::Duration::days(RETENTION_DAYS)),
            })
        });
        let deleted = deleted.ok_or_else(|| self.not_found(K::NAME, name))?;
        debug!(region = %address, kind = K::NAME, name, "Delete started");

        Ok(Box::new(InMemoryPendingDelete {
            region: Arc::clone(&self.region),
            remaining: self.region.polls_until_deleted(),
            result: Some(deleted),
        }))
    }
}

/// Delete that reports `Pending` a configured number of times
pub struct InMemoryPendingDelete<R> {
    region: Arc<InMemoryRegion>,
    remaining: usize,
    result: Option<DeletedRecord<R>>,
}

#[async_trait]
impl<R: Send + Sync + 'static> PendingDelete<R> for InMemoryPendingDelete<R> {
    async fn poll(&mut self) -> VaultResult<DeleteStatus<R>> {
        self.region.enter(Access::Poll).await?;

        if self.remaining > 0 {
            self.remaining -= 1;
            return Ok(DeleteStatus::Pending);
        }
        self.result
            .take()
            .map(DeleteStatus::Completed)
            .ok_or_else(|| VaultError::conflict("delete operation already completed"))
    }
}
