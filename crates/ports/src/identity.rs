//! Credential and local identity traits

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use vaultpair_errors::VaultResult;

/// Token source produced by an access method.
///
/// Refresh and validity are the implementation's concern.
#[async_trait]
pub trait Credential: Send + Sync + fmt::Debug {
    /// Principal the credential authenticates as (user principal name or app id)
    async fn principal_name(&self) -> VaultResult<String>;
}

/// Credential bound to one vault, reused for every call against it
#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    vault: String,
    method: String,
    credential: Arc<dyn Credential>,
}

impl ResolvedCredential {
    pub fn new(
        vault: impl Into<String>,
        method: impl Into<String>,
        credential: Arc<dyn Credential>,
    ) -> Self {
        Self {
            vault: vault.into(),
            method: method.into(),
            credential,
        }
    }

    pub fn vault(&self) -> &str {
        &self.vault
    }

    /// Description of the access method that produced the credential
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn credential(&self) -> &Arc<dyn Credential> {
        &self.credential
    }
}

/// Certificate with private key, found in the local store
#[derive(Clone)]
pub struct CertificateMaterial {
    pub thumbprint: String,
    pub subject: String,
    pub der: Vec<u8>,
}

impl fmt::Debug for CertificateMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateMaterial")
            .field("thumbprint", &self.thumbprint)
            .field("subject", &self.subject)
            .field("der", &format_args!("[{} bytes]", self.der.len()))
            .finish()
    }
}

/// Outcome of a thumbprint lookup
#[derive(Debug, Clone)]
pub enum CertificateLookup {
    Found(CertificateMaterial),
    NotFound,
    Ambiguous(usize),
}

/// Local certificate store
pub trait IdentityLookup: Send + Sync {
    fn find_by_thumbprint(&self, thumbprint: &str) -> CertificateLookup;
}

/// Constructs credentials for each access method
#[async_trait]
pub trait CredentialFactory: Send + Sync {
    async fn client_certificate(
        &self,
        tenant_id: &str,
        client_id: &str,
        certificate: CertificateMaterial,
    ) -> VaultResult<Arc<dyn Credential>>;

    async fn client_secret(
        &self,
        tenant_id: &str,
        client_id: &str,
        client_secret: &SecretString,
    ) -> VaultResult<Arc<dyn Credential>>;

    /// Requires user-facing consent; never retried automatically
    async fn interactive_user(
        &self,
        tenant_id: &str,
        client_id: &str,
        redirect_uri: &str,
    ) -> VaultResult<Arc<dyn Credential>>;
}
