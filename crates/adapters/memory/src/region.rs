//! In-memory regional store

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use secrecy::SecretString;
use tracing::debug;
use vaultpair_errors::{VaultError, VaultResult};
use vaultpair_ports::{
    CertificateImport, CertificateRecord, Certificates, DeletedRecord, JsonWebKey, KeyRecord, Keys,
    SecretRecord, Secrets, WriteProperties,
};

use crate::client::StoredKind;

const DEFAULT_PAGE_SIZE: usize = 25;

/// Live versions (oldest first) and soft-deleted records of one kind
pub struct RecordStore<R> {
    live: BTreeMap<String, Vec<R>>,
    deleted: BTreeMap<String, DeletedRecord<R>>,
}

impl<R> Default for RecordStore<R> {
    fn default() -> Self {
        Self {
            live: BTreeMap::new(),
            deleted: BTreeMap::new(),
        }
    }
}

impl<R: Clone> RecordStore<R> {
    pub(crate) fn latest(&self, name: &str) -> Option<&R> {
        self.live.get(&key(name)).and_then(|versions| versions.last())
    }

    pub(crate) fn versions(&self, name: &str) -> &[R] {
        self.live.get(&key(name)).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn latest_of_each(&self) -> Vec<R> {
        self.live
            .values()
            .filter_map(|versions| versions.last().cloned())
            .collect()
    }

    pub(crate) fn push(&mut self, name: &str, record: R) {
        self.live.entry(key(name)).or_default().push(record);
    }

    pub(crate) fn is_deleted(&self, name: &str) -> bool {
        self.deleted.contains_key(&key(name))
    }

    pub(crate) fn deleted(&self, name: &str) -> Option<&DeletedRecord<R>> {
        self.deleted.get(&key(name))
    }

    /// Moves every live version to the deleted set, returning the latest.
    pub(crate) fn soft_delete(
        &mut self,
        name: &str,
        deleted: impl FnOnce(R) -> DeletedRecord<R>,
    ) -> Option<DeletedRecord<R>> {
        let latest = self.live.remove(&key(name))?.pop()?;
        let record = deleted(latest);
        self.deleted.insert(key(name), record.clone());
        Some(record)
    }
}

// Vault names of records are case-insensitive.
fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Records of every kind held by a region
#[derive(Default)]
pub struct RegionState {
    pub(crate) secrets: RecordStore<SecretRecord>,
    pub(crate) keys: RecordStore<KeyRecord>,
    pub(crate) certificates: RecordStore<CertificateRecord>,
}

/// Injected failure mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    None,
    /// Every call fails with the status
    All(u16),
    /// Writes and deletes fail with the status
    Writes(u16),
    /// Polls of started deletes fail with the status
    Polls(u16),
}

/// Kind of call entering the region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read,
    Write,
    Poll,
}

/// One region of the store.
///
/// Faults, latency, page size and delete completion are adjustable while
/// clients hold the region.
pub struct InMemoryRegion {
    name: String,
    address: String,
    state: Mutex<RegionState>,
    fault: Mutex<Fault>,
    calls: AtomicUsize,
    delete_polls: AtomicUsize,
    polls_until_deleted: AtomicUsize,
    page_size: AtomicUsize,
    latency_ms: AtomicU64,
}

impl InMemoryRegion {
    /// Region addressed like the default endpoint template
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        let name = name.into();
        let address = format!("https://{}.vault.azure.net/", name);
        Self::with_address(name, address)
    }

    pub fn with_address(name: impl Into<String>, address: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            address: address.into(),
            state: Mutex::new(RegionState::default()),
            fault: Mutex::new(Fault::None),
            calls: AtomicUsize::new(0),
            delete_polls: AtomicUsize::new(0),
            polls_until_deleted: AtomicUsize::new(0),
            page_size: AtomicUsize::new(DEFAULT_PAGE_SIZE),
            latency_ms: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Fail every call with `status`
    pub fn fail_all(&self, status: u16) {
        *self.fault.lock() = Fault::All(status);
    }

    /// Fail writes and deletes with `status`; reads keep working
    pub fn fail_writes(&self, status: u16) {
        *self.fault.lock() = Fault::Writes(status);
    }

    /// Fail polls of started deletes with `status`; starting a delete works
    pub fn fail_delete_polls(&self, status: u16) {
        *self.fault.lock() = Fault::Polls(status);
    }

    pub fn heal(&self) {
        *self.fault.lock() = Fault::None;
    }

    pub fn set_page_size(&self, page_size: usize) {
        self.page_size.store(page_size.max(1), Ordering::SeqCst);
    }

    /// Number of `Pending` answers a started delete gives before completing
    pub fn set_delete_polls(&self, polls: usize) {
        self.polls_until_deleted.store(polls, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Calls that reached the region, failed ones included. Delete polls
    /// are counted separately.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn delete_poll_count(&self) -> usize {
        self.delete_polls.load(Ordering::SeqCst)
    }

    pub(crate) fn page_size(&self) -> usize {
        self.page_size.load(Ordering::SeqCst)
    }

    pub(crate) fn polls_until_deleted(&self) -> usize {
        self.polls_until_deleted.load(Ordering::SeqCst)
    }

    /// Applies latency and injected faults to an incoming call.
    pub(crate) async fn enter(&self, access: Access) -> VaultResult<()> {
        match access {
            Access::Poll => self.delete_polls.fetch_add(1, Ordering::SeqCst),
            Access::Read | Access::Write => self.calls.fetch_add(1, Ordering::SeqCst),
        };

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        let fault = *self.fault.lock();
        match (fault, access) {
            (Fault::All(status), _)
            | (Fault::Writes(status), Access::Write)
            | (Fault::Polls(status), Access::Poll) => {
                debug!(region = %self.address, status, ?access, "Injected failure");
                Err(VaultError::from_status(
                    status,
                    format!("injected failure in {}", self.name),
                ))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn with_state<T>(&self, f: impl FnOnce(&mut RegionState) -> T) -> T {
        f(&mut self.state.lock())
    }

    fn seed<K: StoredKind>(&self, name: &str, value: &K::Value) -> K::Record {
        let record = K::build(&self.address, name, value, &WriteProperties::default());
        self.with_state(|state| K::store(state).push(name, record.clone()));
        record
    }

    /// Store a secret version directly, bypassing faults and counters
    pub fn put_secret(&self, name: &str, value: &str) -> SecretRecord {
        self.seed::<Secrets>(name, &SecretString::new(value.to_string()))
    }

    pub fn put_key(&self, name: &str, key: JsonWebKey) -> KeyRecord {
        self.seed::<Keys>(name, &key)
    }

    pub fn put_certificate(&self, name: &str, certificate: &[u8]) -> CertificateRecord {
        self.seed::<Certificates>(name, &CertificateImport::new(certificate))
    }

    /// Latest live version
    pub fn stored_secret(&self, name: &str) -> Option<SecretRecord> {
        self.with_state(|state| state.secrets.latest(name).cloned())
    }

    pub fn stored_key(&self, name: &str) -> Option<KeyRecord> {
        self.with_state(|state| state.keys.latest(name).cloned())
    }

    pub fn stored_certificate(&self, name: &str) -> Option<CertificateRecord> {
        self.with_state(|state| state.certificates.latest(name).cloned())
    }

    pub fn deleted_secret(&self, name: &str) -> Option<DeletedRecord<SecretRecord>> {
        self.with_state(|state| state.secrets.deleted(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fault_injection() {
        let region = InMemoryRegion::new("contoso-east");

        region.fail_writes(503);
        assert!(region.enter(Access::Read).await.is_ok());
        assert!(matches!(
            region.enter(Access::Write).await,
            Err(VaultError::ExternalService(_))
        ));

        region.fail_all(404);
        assert!(region.enter(Access::Read).await.unwrap_err().is_not_found());

        region.fail_delete_polls(500);
        assert!(region.enter(Access::Write).await.is_ok());
        assert!(region.enter(Access::Poll).await.is_err());

        region.heal();
        assert!(region.enter(Access::Write).await.is_ok());
        assert_eq!(region.call_count(), 5);
        assert_eq!(region.delete_poll_count(), 1);
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let region = InMemoryRegion::new("contoso-east");
        region.put_secret("Db-Password", "v1");
        assert!(region.stored_secret("db-password").is_some());
    }

    #[test]
    fn test_versions_accumulate() {
        let region = InMemoryRegion::new("contoso-east");
        let first = region.put_secret("db-password", "v1");
        let second = region.put_secret("db-password", "v2");

        assert_ne!(first.version, second.version);
        let versions = region.with_state(|state| state.secrets.versions("db-password").len());
        assert_eq!(versions, 2);
    }
}
