//! Two-region vault facade

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vaultpair_common::{VaultName, with_audit_tags};
use vaultpair_config::{FacadeSettings, VaultAccessType, VaultsConfig};
use vaultpair_errors::{VaultError, VaultResult};
use vaultpair_ports::{
    Certificates, CredentialFactory, DeletedRecord, IdentityLookup, Keys, RegionConnector,
    RegionRole, ResolvedCredential, ResourceKind, ResourceProperties, Secrets, Tags, VaultEndpoint,
    WriteProperties, WriteValue,
};

use crate::cancel::cancellable;
use crate::credential::CredentialResolver;
use crate::paging::{ListProgress, drain_pages};
use crate::region::RegionClientSet;

/// External collaborators the facade is built from
#[derive(Clone)]
pub struct Backends {
    pub connector: Arc<dyn RegionConnector>,
    pub credentials: Arc<dyn CredentialFactory>,
    pub identities: Arc<dyn IdentityLookup>,
}

/// Drops empty entries and checks what is left: one or two well-formed names
/// that do not refer to the same vault.
pub fn validate_vault_names(names: &[String]) -> VaultResult<Vec<VaultName>> {
    let names: Vec<&str> = names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        return Err(VaultError::configuration("At least one vault name is required"));
    }
    if names.len() > 2 {
        return Err(VaultError::configuration(format!(
            "At most two vault names are supported, got {}",
            names.len()
        )));
    }

    let parsed = names
        .into_iter()
        .map(VaultName::parse)
        .collect::<VaultResult<Vec<_>>>()?;

    if parsed.len() == 2 && parsed[0].same_vault(parsed[1].as_str()) {
        return Err(VaultError::configuration(format!(
            "Primary and secondary vault names refer to the same vault: {}",
            parsed[0]
        )));
    }

    Ok(parsed)
}

/// Resilient client over a primary and an optional secondary vault.
///
/// Reads fail over from primary to secondary. Writes and deletes go to every
/// region and fail unless every region accepted them. Listings target one
/// caller-chosen region.
///
/// Immutable after [`VaultFacade::connect`] apart from the remembered
/// principal name, so it can be shared through an `Arc`.
pub struct VaultFacade {
    endpoints: Vec<VaultEndpoint>,
    credentials: Vec<ResolvedCredential>,
    pub(crate) secrets: RegionClientSet<Secrets>,
    pub(crate) keys: RegionClientSet<Keys>,
    pub(crate) certificates: RegionClientSet<Certificates>,
    access_type: VaultAccessType,
    delete_poll_interval: Duration,
    principal: OnceCell<String>,
}

impl VaultFacade {
    /// Validates the vault names, resolves one credential per vault and
    /// connects the per-kind clients of every region.
    ///
    /// Name problems are reported before any credential is built or any
    /// backend is contacted.
    pub async fn connect(
        vaults: VaultsConfig,
        settings: &FacadeSettings,
        backends: Backends,
        cancel: &CancellationToken,
    ) -> VaultResult<Self> {
        let names = validate_vault_names(&settings.vault_names)?;

        let endpoints: Vec<VaultEndpoint> = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| VaultEndpoint {
                address: settings.endpoint_address(name.as_str()),
                role: if index == 0 {
                    RegionRole::Primary
                } else {
                    RegionRole::Secondary
                },
                name,
            })
            .collect();

        let resolver = CredentialResolver::new(
            vaults,
            Arc::clone(&backends.credentials),
            Arc::clone(&backends.identities),
        );

        let mut credentials = Vec::with_capacity(endpoints.len());
        for endpoint in &endpoints {
            let credential = cancellable(
                cancel,
                resolver.resolve(endpoint.name.as_str(), settings.access_type),
            )
            .await?;
            credentials.push(credential);
        }

        let mut secrets = Vec::with_capacity(endpoints.len());
        let mut keys = Vec::with_capacity(endpoints.len());
        let mut certificates = Vec::with_capacity(endpoints.len());
        for (endpoint, credential) in endpoints.iter().zip(&credentials) {
            debug!(vault = %endpoint.name, region = %endpoint.address, role = %endpoint.role, "Connecting region");
            secrets.push(backends.connector.secrets(endpoint, credential)?);
            keys.push(backends.connector.keys(endpoint, credential)?);
            certificates.push(backends.connector.certificates(endpoint, credential)?);
        }

        info!(
            primary = %endpoints[0].address,
            secondary = endpoints.get(1).map(|e| e.address.as_str()).unwrap_or("none"),
            access = %settings.access_type,
            "Vault facade connected"
        );

        Ok(Self {
            endpoints,
            credentials,
            secrets: RegionClientSet::from_clients(secrets)?,
            keys: RegionClientSet::from_clients(keys)?,
            certificates: RegionClientSet::from_clients(certificates)?,
            access_type: settings.access_type,
            delete_poll_interval: settings.delete_poll_interval(),
            principal: OnceCell::new(),
        })
    }

    /// Configured endpoints, primary first
    pub fn endpoints(&self) -> &[VaultEndpoint] {
        &self.endpoints
    }

    pub fn access_type(&self) -> VaultAccessType {
        self.access_type
    }

    /// Principal name recorded by the first write, if any write happened yet
    pub fn authenticated_principal(&self) -> Option<&str> {
        self.principal.get().map(String::as_str)
    }

    /// Establishes the principal name once, from the primary's credential.
    async fn changed_by(&self) -> VaultResult<&str> {
        let principal = self
            .principal
            .get_or_try_init(|| async {
                let name = self.credentials[0].credential().principal_name().await?;
                info!(principal = %name, "Authenticated principal established");
                Ok::<_, VaultError>(name)
            })
            .await?;
        Ok(principal.as_str())
    }

    pub(crate) async fn get_resource<K: ResourceKind>(
        &self,
        set: &RegionClientSet<K>,
        name: &str,
        version: Option<&str>,
        cancel: &CancellationToken,
    ) -> VaultResult<K::Record> {
        let resource = format!("{} {}", K::NAME, name);
        cancellable(
            cancel,
            set.read_with_failover("get", &resource, move |client| async move {
                client.get(name, version).await
            }),
        )
        .await
    }

    pub(crate) async fn set_resource<K: ResourceKind>(
        &self,
        set: &RegionClientSet<K>,
        name: &str,
        value: &K::Value,
        tags: Option<Tags>,
        content_type: Option<String>,
        cancel: &CancellationToken,
    ) -> VaultResult<K::Record> {
        let resource = format!("{} {}", K::NAME, name);
        cancellable(cancel, async {
            let changed_by = self.changed_by().await?;
            let properties = WriteProperties {
                content_type,
                tags: with_audit_tags(tags, &value.fingerprint_bytes(), changed_by),
            };
            let properties = &properties;

            set.fan_out_write("set", &resource, move |client| async move {
                client.set(name, value, properties).await
            })
            .await
        })
        .await
    }

    pub(crate) async fn list_resources<K: ResourceKind>(
        &self,
        set: &RegionClientSet<K>,
        region_index: usize,
        on_progress: Option<ListProgress<'_>>,
        cancel: &CancellationToken,
    ) -> VaultResult<Vec<ResourceProperties>> {
        let client = Arc::clone(set.region(region_index)?);
        debug!(kind = K::NAME, region = client.vault_uri(), "Listing");

        let items = cancellable(
            cancel,
            drain_pages(
                |continuation| {
                    let client = Arc::clone(&client);
                    async move { client.list_properties(continuation).await }
                },
                on_progress,
            ),
        )
        .await?;

        info!(kind = K::NAME, region = client.vault_uri(), count = items.len(), "Listing complete");
        Ok(items)
    }

    pub(crate) async fn list_versions<K: ResourceKind>(
        &self,
        set: &RegionClientSet<K>,
        name: &str,
        region_index: usize,
        cancel: &CancellationToken,
    ) -> VaultResult<Vec<ResourceProperties>> {
        let client = Arc::clone(set.region(region_index)?);
        debug!(kind = K::NAME, name, region = client.vault_uri(), "Listing versions");

        cancellable(
            cancel,
            drain_pages(
                |continuation| {
                    let client = Arc::clone(&client);
                    async move { client.list_property_versions(name, continuation).await }
                },
                None,
            ),
        )
        .await
    }

    pub(crate) async fn delete_resource<K: ResourceKind>(
        &self,
        set: &RegionClientSet<K>,
        name: &str,
        cancel: &CancellationToken,
    ) -> VaultResult<DeletedRecord<K::Record>> {
        let resource = format!("{} {}", K::NAME, name);
        cancellable(
            cancel,
            set.fan_out_delete(&resource, self.delete_poll_interval, move |client| async move {
                client.start_delete(name).await
            }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_empty_entries_are_dropped() {
        let parsed = validate_vault_names(&names(&["contoso-east", "", "  "])).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].as_str(), "contoso-east");
    }

    #[test]
    fn test_name_count_limits() {
        assert!(validate_vault_names(&names(&[])).is_err());
        assert!(validate_vault_names(&names(&["", ""])).is_err());
        assert!(validate_vault_names(&names(&["vault-a", "vault-b", "vault-c"])).is_err());
        assert_eq!(
            validate_vault_names(&names(&["vault-a", "vault-b"]))
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_case_insensitive_duplicates_rejected() {
        let err = validate_vault_names(&names(&["Contoso-East", "contoso-EAST"])).unwrap_err();
        assert!(matches!(err, VaultError::Configuration(_)));
    }

    #[test]
    fn test_malformed_name_rejected() {
        let err = validate_vault_names(&names(&["contoso--east"])).unwrap_err();
        assert!(matches!(err, VaultError::Configuration(_)));
    }
}
