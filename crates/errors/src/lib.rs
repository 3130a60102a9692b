//! vaultpair-errors - unified error handling
//!
//! Every fallible operation in the workspace returns [`VaultResult`]. Aggregate
//! variants keep one [`AttemptFailure`] per alternative tried, in attempt order,
//! so callers can see which region or access method failed and why.

use std::fmt;

use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(
        "Failed to get access to {vault} with all possible {access} vault access method(s){}",
        render_attempts(.attempts)
    )]
    AccessResolution {
        vault: String,
        access: String,
        attempts: Vec<AttemptFailure>,
    },

    #[error(
        "Failed to {operation} {resource}: not found or inaccessible in vault(s){}",
        render_attempts(.attempts)
    )]
    RegionAccess {
        operation: String,
        resource: String,
        attempts: Vec<AttemptFailure>,
    },

    #[error(
        "Failed to {operation} {resource} in every region (accepted by: {}){}",
        render_regions(.succeeded),
        render_attempts(.failures)
    )]
    WriteConsistency {
        operation: String,
        resource: String,
        failures: Vec<AttemptFailure>,
        succeeded: Vec<String>,
    },

    #[error("Region index {index} is out of range, {configured} region(s) configured")]
    RegionIndexOutOfRange { index: usize, configured: usize },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Throttled: {0}")]
    Throttled(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Credential error: {0}")]
    Credential(String),
}

/// Local certificate material lookup failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Certificate with thumbprint {thumbprint} not found")]
    NotFound { thumbprint: String },

    #[error("Certificate thumbprint {thumbprint} is ambiguous: {matches} matching certificates")]
    Ambiguous { thumbprint: String, matches: usize },
}

/// One failed alternative inside an aggregate error.
#[derive(Debug)]
pub struct AttemptFailure {
    /// Endpoint URI or access method description
    pub target: String,
    pub error: VaultError,
}

impl AttemptFailure {
    pub fn new(target: impl Into<String>, error: VaultError) -> Self {
        Self {
            target: target.into(),
            error,
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.error)
    }
}

fn render_attempts(attempts: &[AttemptFailure]) -> String {
    attempts
        .iter()
        .enumerate()
        .map(|(i, a)| format!("\n  [{}] {}", i + 1, a))
        .collect()
}

fn render_regions(regions: &[String]) -> String {
    if regions.is_empty() {
        "none".to_string()
    } else {
        regions.join(", ")
    }
}

impl VaultError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn throttled(msg: impl Into<String>) -> Self {
        Self::Throttled(msg.into())
    }

    pub fn external_service(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// Classify a transport-level HTTP status into an error variant.
    pub fn from_status(status: u16, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        match status {
            404 => Self::NotFound(msg),
            403 => Self::Forbidden(msg),
            401 => Self::Unauthenticated(msg),
            409 => Self::Conflict(msg),
            429 => Self::Throttled(msg),
            // connection, timeout and 5xx all land here
            _ => Self::ExternalService(format!("status {}: {}", status, msg)),
        }
    }

    /// Per-alternative failures carried by an aggregate error, in attempt order.
    pub fn attempts(&self) -> &[AttemptFailure] {
        match self {
            Self::AccessResolution { attempts, .. } | Self::RegionAccess { attempts, .. } => {
                attempts
            }
            Self::WriteConsistency { failures, .. } => failures,
            _ => &[],
        }
    }

    /// The first observed failure of a fan-out operation.
    pub fn first_failure(&self) -> Option<&AttemptFailure> {
        self.attempts().first()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias
pub type VaultResult<T> = Result<T, VaultError>;
