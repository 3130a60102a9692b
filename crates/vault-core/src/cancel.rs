//! Caller cancellation

use std::future::Future;

use tokio_util::sync::CancellationToken;
use vaultpair_errors::{VaultError, VaultResult};

/// Runs `operation` until it finishes or `cancel` fires.
///
/// On cancellation the operation future is dropped, which drops every regional
/// call still in flight inside it.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, operation: F) -> VaultResult<T>
where
    F: Future<Output = VaultResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(VaultError::Cancelled),
        result = operation => result,
    }
}
