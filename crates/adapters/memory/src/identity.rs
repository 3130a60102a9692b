//! Static credentials and an in-memory certificate store

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use vaultpair_errors::{VaultError, VaultResult};
use vaultpair_ports::{
    CertificateLookup, CertificateMaterial, Credential, CredentialFactory, IdentityLookup,
};

/// Credential that always authenticates as the same principal
#[derive(Debug)]
pub struct StaticCredential {
    principal: String,
    client_id: String,
    lookups: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl StaticCredential {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

#[async_trait]
impl Credential for StaticCredential {
    async fn principal_name(&self) -> VaultResult<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.principal.clone())
    }
}

/// Credential factory that records every construction attempt.
///
/// Clients registered with [`StaticCredentialFactory::failing_client`] are
/// rejected, whatever the access method.
#[derive(Debug)]
pub struct StaticCredentialFactory {
    principal: String,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
    lookups: Arc<AtomicUsize>,
    principal_delay: Option<Duration>,
}

impl StaticCredentialFactory {
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
            lookups: Arc::new(AtomicUsize::new(0)),
            principal_delay: None,
        }
    }

    pub fn failing_client(mut self, client_id: impl Into<String>) -> Self {
        self.failing.insert(client_id.into());
        self
    }

    /// Makes every principal lookup take `delay`
    pub fn with_principal_delay(mut self, delay: Duration) -> Self {
        self.principal_delay = Some(delay);
        self
    }

    /// Client ids, in the order credentials were requested
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Principal lookups across every credential produced so far
    pub fn principal_lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn issue(&self, client_id: &str) -> VaultResult<Arc<dyn Credential>> {
        self.calls.lock().push(client_id.to_string());

        if self.failing.contains(client_id) {
            return Err(VaultError::credential(format!(
                "client {} was rejected by the identity provider",
                client_id
            )));
        }

        Ok(Arc::new(StaticCredential {
            principal: self.principal.clone(),
            client_id: client_id.to_string(),
            lookups: Arc::clone(&self.lookups),
            delay: self.principal_delay,
        }))
    }
}

#[async_trait]
impl CredentialFactory for StaticCredentialFactory {
    async fn client_certificate(
        &self,
        _tenant_id: &str,
        client_id: &str,
        _certificate: CertificateMaterial,
    ) -> VaultResult<Arc<dyn Credential>> {
        self.issue(client_id)
    }

    async fn client_secret(
        &self,
        _tenant_id: &str,
        client_id: &str,
        client_secret: &SecretString,
    ) -> VaultResult<Arc<dyn Credential>> {
        let credential = self.issue(client_id)?;
        if client_secret.expose_secret().is_empty() {
            return Err(VaultError::credential(format!(
                "client {} has an empty secret",
                client_id
            )));
        }
        Ok(credential)
    }

    async fn interactive_user(
        &self,
        _tenant_id: &str,
        client_id: &str,
        _redirect_uri: &str,
    ) -> VaultResult<Arc<dyn Credential>> {
        self.issue(client_id)
    }
}

/// Local certificate store. Thumbprints match case-insensitively.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    certificates: Vec<CertificateMaterial>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_certificate(mut self, certificate: CertificateMaterial) -> Self {
        self.certificates.push(certificate);
        self
    }
}

impl IdentityLookup for InMemoryIdentityStore {
    fn find_by_thumbprint(&self, thumbprint: &str) -> CertificateLookup {
        let mut matches = self
            .certificates
            .iter()
            .filter(|c| c.thumbprint.eq_ignore_ascii_case(thumbprint));

        match (matches.next(), matches.count()) {
            (None, _) => CertificateLookup::NotFound,
            (Some(certificate), 0) => CertificateLookup::Found(certificate.clone()),
            (Some(_), others) => CertificateLookup::Ambiguous(others + 1),
        }
    }
}
