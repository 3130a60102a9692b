//! Common type definitions

use derive_more::Display;
use serde::{Deserialize, Serialize};
use vaultpair_errors::{VaultError, VaultResult};

/// Validated vault name.
///
/// 3-24 characters, ASCII alphanumerics and `-`, must start with a letter,
/// must not end with `-` and must not contain `--`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(try_from = "String", into = "String")]
pub struct VaultName(String);

impl VaultName {
    pub fn parse(name: impl Into<String>) -> VaultResult<Self> {
        let name = name.into();
        guard_vault_name(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Vault names are compared case-insensitively.
    pub fn same_vault(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl TryFrom<String> for VaultName {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<VaultName> for String {
    fn from(value: VaultName) -> Self {
        value.0
    }
}

impl AsRef<str> for VaultName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn guard_vault_name(name: &str) -> VaultResult<()> {
    let invalid = |reason: &str| {
        Err(VaultError::configuration(format!(
            "Invalid vault name '{}': {}",
            name, reason
        )))
    };

    if !(3..=24).contains(&name.len()) {
        return invalid("length must be between 3 and 24 characters");
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return invalid("only ASCII letters, digits and '-' are allowed");
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return invalid("must start with a letter");
    }
    if name.ends_with('-') {
        return invalid("must not end with '-'");
    }
    if name.contains("--") {
        return invalid("must not contain consecutive '-'");
    }
    Ok(())
}
