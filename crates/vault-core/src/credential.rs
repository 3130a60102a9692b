//! Credential resolution over a vault's prioritized access methods

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use vaultpair_config::{AccessCredentials, AccessMethod, VaultAccessType, VaultsConfig};
use vaultpair_errors::{AttemptFailure, LookupError, VaultError, VaultResult};
use vaultpair_ports::{
    CertificateLookup, CertificateMaterial, Credential, CredentialFactory, IdentityLookup,
    ResolvedCredential,
};

/// Turns a vault's configured access methods into one usable credential.
pub struct CredentialResolver {
    vaults: VaultsConfig,
    factory: Arc<dyn CredentialFactory>,
    identities: Arc<dyn IdentityLookup>,
}

impl CredentialResolver {
    pub fn new(
        vaults: VaultsConfig,
        factory: Arc<dyn CredentialFactory>,
        identities: Arc<dyn IdentityLookup>,
    ) -> Self {
        Self {
            vaults,
            factory,
            identities,
        }
    }

    /// Tries the access methods of `vault_name` in ascending `order` and
    /// returns the first credential that can be constructed.
    ///
    /// Methods with equal `order` keep their configured relative position.
    /// When nothing succeeds the error lists every failed method in the order
    /// it was tried.
    pub async fn resolve(
        &self,
        vault_name: &str,
        access: VaultAccessType,
    ) -> VaultResult<ResolvedCredential> {
        let unresolved = |attempts: Vec<AttemptFailure>| VaultError::AccessResolution {
            vault: vault_name.to_string(),
            access: access.to_string(),
            attempts,
        };

        let Some(policy) = self.vaults.access_policy(vault_name) else {
            error!(vault = %vault_name, "Vault is not present in the vaults configuration");
            return Err(unresolved(vec![AttemptFailure::new(
                "configuration",
                VaultError::configuration(format!(
                    "{} is not found in the vaults configuration",
                    vault_name
                )),
            )]));
        };

        let mut candidates: Vec<&AccessMethod> = policy.methods(access).iter().collect();
        candidates.sort_by_key(|method| method.order);

        if candidates.is_empty() {
            error!(vault = %vault_name, %access, "No vault access methods configured");
            return Err(unresolved(vec![AttemptFailure::new(
                "configuration",
                VaultError::configuration(format!(
                    "{} has no {} access methods configured",
                    vault_name, access
                )),
            )]));
        }

        let mut attempts = Vec::with_capacity(candidates.len());
        for method in candidates {
            debug!(vault = %vault_name, method = %method, "Trying vault access method");

            match self.materialize(method).await {
                Ok(credential) => {
                    info!(vault = %vault_name, method = %method, "Resolved vault credential");
                    return Ok(ResolvedCredential::new(
                        vault_name,
                        method.to_string(),
                        credential,
                    ));
                }
                Err(e) => {
                    warn!(vault = %vault_name, method = %method, error = %e, "Vault access method failed");
                    attempts.push(AttemptFailure::new(method.to_string(), e));
                }
            }
        }

        error!(
            vault = %vault_name,
            %access,
            attempts = attempts.len(),
            "Every vault access method failed"
        );
        Err(unresolved(attempts))
    }

    async fn materialize(&self, method: &AccessMethod) -> VaultResult<Arc<dyn Credential>> {
        match &method.credentials {
            AccessCredentials::ClientCertificate {
                tenant_id,
                client_id,
                certificate_thumbprint,
            } => {
                let certificate = self.certificate(certificate_thumbprint)?;
                self.factory
                    .client_certificate(tenant_id, client_id, certificate)
                    .await
            }
            AccessCredentials::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            } => {
                self.factory
                    .client_secret(tenant_id, client_id, client_secret)
                    .await
            }
            AccessCredentials::InteractiveUser {
                tenant_id,
                client_id,
                redirect_uri,
            } => {
                self.factory
                    .interactive_user(tenant_id, client_id, redirect_uri)
                    .await
            }
        }
    }

    /// Exactly one local match is required; several matches are rejected
    /// rather than guessing which one carries the right private key.
    fn certificate(&self, thumbprint: &str) -> VaultResult<CertificateMaterial> {
        match self.identities.find_by_thumbprint(thumbprint) {
            CertificateLookup::Found(certificate) => Ok(certificate),
            CertificateLookup::NotFound => Err(LookupError::NotFound {
                thumbprint: thumbprint.to_string(),
            }
            .into()),
            CertificateLookup::Ambiguous(matches) => Err(LookupError::Ambiguous {
                thumbprint: thumbprint.to_string(),
                matches,
            }
            .into()),
        }
    }
}
