//! vaultpair-config - configuration loading
//!
//! Two documents are loaded here: the access-policy table (`VaultsConfig`),
//! which lists for every vault the ordered access methods that may produce a
//! credential, and the facade settings (`FacadeSettings`), which pick the
//! vaults to connect to and tune the client.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Toml},
};
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(String),

    #[error("Vault {0} is configured more than once (names are case-insensitive)")]
    DuplicateVault(String),
}

/// Which access method list of a vault to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultAccessType {
    ReadOnly,
    ReadWrite,
}

impl fmt::Display for VaultAccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => f.write_str("read-only"),
            Self::ReadWrite => f.write_str("read-write"),
        }
    }
}

/// One way of obtaining a credential for a vault.
///
/// Lower `order` is tried first.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessMethod {
    pub order: i32,
    #[serde(flatten)]
    pub credentials: AccessCredentials,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessCredentials {
    ClientCertificate {
        tenant_id: String,
        client_id: String,
        certificate_thumbprint: String,
    },
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: Secret<String>,
    },
    InteractiveUser {
        tenant_id: String,
        client_id: String,
        #[serde(default = "default_redirect_uri")]
        redirect_uri: String,
    },
}

fn default_redirect_uri() -> String {
    "http://localhost".to_string()
}

impl AccessMethod {
    pub fn client_certificate(
        order: i32,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        certificate_thumbprint: impl Into<String>,
    ) -> Self {
        Self {
            order,
            credentials: AccessCredentials::ClientCertificate {
                tenant_id: tenant_id.into(),
                client_id: client_id.into(),
                certificate_thumbprint: certificate_thumbprint.into(),
            },
        }
    }

    pub fn client_secret(
        order: i32,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            order,
            credentials: AccessCredentials::ClientSecret {
                tenant_id: tenant_id.into(),
                client_id: client_id.into(),
                client_secret: Secret::new(client_secret.into()),
            },
        }
    }

    pub fn interactive_user(
        order: i32,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            order,
            credentials: AccessCredentials::InteractiveUser {
                tenant_id: tenant_id.into(),
                client_id: client_id.into(),
                redirect_uri: default_redirect_uri(),
            },
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.credentials {
            AccessCredentials::ClientCertificate { .. } => "ClientCertificate",
            AccessCredentials::ClientSecret { .. } => "ClientSecret",
            AccessCredentials::InteractiveUser { .. } => "InteractiveUser",
        }
    }
}

// Never prints the client secret.
impl fmt::Display for AccessMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.credentials {
            AccessCredentials::ClientCertificate {
                client_id,
                certificate_thumbprint,
                ..
            } => write!(
                f,
                "ClientCertificate(order={}, client_id={}, thumbprint={})",
                self.order, client_id, certificate_thumbprint
            ),
            AccessCredentials::ClientSecret { client_id, .. } => write!(
                f,
                "ClientSecret(order={}, client_id={})",
                self.order, client_id
            ),
            AccessCredentials::InteractiveUser { client_id, .. } => write!(
                f,
                "InteractiveUser(order={}, client_id={})",
                self.order, client_id
            ),
        }
    }
}

/// Access methods of one vault
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VaultAccessPolicy {
    #[serde(default)]
    pub read_only: Vec<AccessMethod>,
    #[serde(default)]
    pub read_write: Vec<AccessMethod>,
}

impl VaultAccessPolicy {
    pub fn methods(&self, access: VaultAccessType) -> &[AccessMethod] {
        match access {
            VaultAccessType::ReadOnly => &self.read_only,
            VaultAccessType::ReadWrite => &self.read_write,
        }
    }
}

/// Vault name -> access policy table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct VaultsConfig {
    vaults: HashMap<String, VaultAccessPolicy>,
}

impl VaultsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a `.json` or `.toml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Figment::from(Json::file(path)),
            Some("toml") => Figment::from(Toml::file(path)),
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };
        figment.extract::<Self>()?.checked()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Figment::from(Json::string(json))
            .extract::<Self>()?
            .checked()
    }

    /// Adds or replaces the policy of a vault. An existing entry whose name
    /// differs only in case is replaced.
    pub fn with_vault(mut self, name: impl Into<String>, policy: VaultAccessPolicy) -> Self {
        let name = name.into();
        self.vaults
            .retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.vaults.insert(name, policy);
        self
    }

    /// Rejects names that only differ in case, so every lookup has one answer.
    fn checked(self) -> Result<Self, ConfigError> {
        let mut names: Vec<String> = self
            .vaults
            .keys()
            .map(|name| name.to_ascii_lowercase())
            .collect();
        names.sort();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::DuplicateVault(pair[0].clone()));
        }
        Ok(self)
    }

    /// Case-insensitive lookup
    pub fn access_policy(&self, vault_name: &str) -> Option<&VaultAccessPolicy> {
        self.vaults.get(vault_name).or_else(|| {
            self.vaults
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(vault_name))
                .map(|(_, policy)| policy)
        })
    }

    pub fn contains(&self, vault_name: &str) -> bool {
        self.access_policy(vault_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.vaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vaults.is_empty()
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

/// Facade settings
#[derive(Debug, Clone, Deserialize)]
pub struct FacadeSettings {
    /// Primary first, optional secondary second
    pub vault_names: Vec<String>,
    #[serde(default = "default_access_type")]
    pub access_type: VaultAccessType,
    /// `{name}` is replaced by the vault name
    #[serde(default = "default_endpoint_template")]
    pub endpoint_template: String,
    #[serde(default = "default_delete_poll_interval_ms")]
    pub delete_poll_interval_ms: u64,
    pub vaults_config_file: Option<String>,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_access_type() -> VaultAccessType {
    VaultAccessType::ReadOnly
}

fn default_endpoint_template() -> String {
    "https://{name}.vault.azure.net/".to_string()
}

fn default_delete_poll_interval_ms() -> u64 {
    1000
}

impl FacadeSettings {
    pub fn new<I, S>(vault_names: I, access_type: VaultAccessType) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vault_names: vault_names.into_iter().map(Into::into).collect(),
            access_type,
            endpoint_template: default_endpoint_template(),
            delete_poll_interval_ms: default_delete_poll_interval_ms(),
            vaults_config_file: None,
            telemetry: TelemetryConfig::default(),
        }
    }

    /// Load from config files and environment variables
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("VAULTPAIR_ENV").unwrap_or_else(|_| "development".to_string());

        let settings: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("VAULTPAIR_").split("__"))
            .extract()?;

        Ok(settings)
    }

    pub fn with_delete_poll_interval(mut self, interval: Duration) -> Self {
        self.delete_poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_endpoint_template(mut self, template: impl Into<String>) -> Self {
        self.endpoint_template = template.into();
        self
    }

    pub fn delete_poll_interval(&self) -> Duration {
        Duration::from_millis(self.delete_poll_interval_ms)
    }

    pub fn endpoint_address(&self, vault_name: &str) -> String {
        self.endpoint_template.replace("{name}", vault_name)
    }

    /// Access-policy table referenced by `vaults_config_file`
    pub fn load_vaults_config(&self) -> Result<VaultsConfig, ConfigError> {
        match &self.vaults_config_file {
            Some(path) => VaultsConfig::from_file(path),
            None => Ok(VaultsConfig::default()),
        }
    }
}
