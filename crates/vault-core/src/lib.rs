//! vaultpair-core - two-region vault client
//!
//! Provides:
//! - Credential resolution over prioritized access methods
//! - Failover reads (primary, then secondary)
//! - Fan-out writes and deletes that fail unless every region accepts
//! - Single-region paginated listings with progress reporting
//! - Per-region health probing

mod cancel;
mod certificates;
pub mod credential;
pub mod facade;
pub mod health;
mod keys;
mod paging;
pub mod region;
mod secrets;

pub use credential::CredentialResolver;
pub use facade::{Backends, VaultFacade, validate_vault_names};
pub use health::{HEALTH_PROBE_NAME, RegionHealth, health_status};
pub use paging::ListProgress;
pub use region::RegionClientSet;
pub use tokio_util::sync::CancellationToken;
