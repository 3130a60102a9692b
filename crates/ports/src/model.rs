//! Records exchanged with the regional backends

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use vaultpair_common::VaultName;

/// Tag map. Never absent: no tags is an empty map.
pub type Tags = HashMap<String, String>;

/// Role of an endpoint within a facade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionRole {
    Primary,
    Secondary,
}

impl fmt::Display for RegionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

/// One configured regional instance of the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultEndpoint {
    pub name: VaultName,
    pub address: String,
    pub role: RegionRole,
}

/// Record attributes shared by secrets, keys and certificates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub enabled: Option<bool>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
    pub not_before: Option<DateTime<Utc>>,
    pub recovery_level: Option<String>,
}

/// Listing item: everything but the value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceProperties {
    pub id: String,
    pub name: String,
    pub version: Option<String>,
    pub content_type: Option<String>,
    pub attributes: Attributes,
    pub tags: Tags,
}

/// Metadata sent along with a write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteProperties {
    pub content_type: Option<String>,
    pub tags: Tags,
}

#[derive(Debug, Clone)]
pub struct SecretRecord {
    pub id: String,
    pub name: String,
    pub version: Option<String>,
    pub value: SecretString,
    pub content_type: Option<String>,
    pub attributes: Attributes,
    pub tags: Tags,
}

/// JSON Web Key material (RFC 7517). Private members are only present when
/// the backend releases them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kty: String,
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_ops: Vec<String>,
    pub n: Option<Vec<u8>>,
    pub e: Option<Vec<u8>>,
    pub d: Option<Vec<u8>>,
    pub dp: Option<Vec<u8>>,
    pub dq: Option<Vec<u8>>,
    pub qi: Option<Vec<u8>>,
    pub p: Option<Vec<u8>>,
    pub q: Option<Vec<u8>>,
    pub k: Option<Vec<u8>>,
    pub t: Option<Vec<u8>>,
    pub crv: Option<String>,
    pub x: Option<Vec<u8>>,
    pub y: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct KeyRecord {
    pub id: String,
    pub name: String,
    pub version: Option<String>,
    pub key: JsonWebKey,
    pub attributes: Attributes,
    pub tags: Tags,
}

/// Certificate issuance policy. Carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificatePolicy {
    pub subject: Option<String>,
    pub subject_alternative_names: Option<SubjectAlternativeNames>,
    pub validity_in_months: Option<i32>,
    pub issuer_name: Option<String>,
    pub key_properties: Option<CertificateKeyProperties>,
    pub content_type: Option<String>,
    #[serde(default)]
    pub enhanced_key_usage: Vec<String>,
    #[serde(default)]
    pub lifetime_actions: Vec<LifetimeAction>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAlternativeNames {
    #[serde(default)]
    pub dns_names: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub user_principal_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateKeyProperties {
    pub exportable: Option<bool>,
    pub key_type: Option<String>,
    pub key_size: Option<i32>,
    pub reuse_key: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeAction {
    pub action: String,
    pub trigger_type: String,
    pub trigger_value: i32,
}

#[derive(Debug, Clone)]
pub struct CertificateRecord {
    pub id: String,
    pub name: String,
    pub version: Option<String>,
    pub cer: Vec<u8>,
    pub content_type: Option<String>,
    pub attributes: Attributes,
    pub tags: Tags,
    pub policy: Option<CertificatePolicy>,
}

/// Certificate write payload
#[derive(Debug, Clone)]
pub struct CertificateImport {
    /// PFX or PEM bytes
    pub certificate: Vec<u8>,
    pub password: Option<SecretString>,
    pub policy: Option<CertificatePolicy>,
}

impl CertificateImport {
    pub fn new(certificate: impl Into<Vec<u8>>) -> Self {
        Self {
            certificate: certificate.into(),
            password: None,
            policy: None,
        }
    }

    pub fn with_policy(mut self, policy: CertificatePolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

/// A soft-deleted record awaiting purge
#[derive(Debug, Clone)]
pub struct DeletedRecord<R> {
    pub record: R,
    pub recovery_id: Option<String>,
    pub deleted_on: Option<DateTime<Utc>>,
    pub scheduled_purge_date: Option<DateTime<Utc>>,
}

/// One page of a listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` on the last page
    pub continuation: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            continuation: None,
        }
    }
}
