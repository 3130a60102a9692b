//! Draining paginated listings

use std::future::Future;

use vaultpair_errors::VaultResult;
use vaultpair_ports::{Page, ResourceProperties};

/// Progress callback, called with the 1-based count of items received so far
pub type ListProgress<'a> = &'a (dyn Fn(usize) + Send + Sync);

/// Follows continuation tokens until the backend reports the last page.
pub(crate) async fn drain_pages<F, Fut>(
    mut fetch: F,
    on_progress: Option<ListProgress<'_>>,
) -> VaultResult<Vec<ResourceProperties>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = VaultResult<Page<ResourceProperties>>>,
{
    let mut items = Vec::new();
    let mut continuation = None;

    loop {
        let page = fetch(continuation.take()).await?;
        for item in page.items {
            items.push(item);
            if let Some(progress) = on_progress {
                progress(items.len());
            }
        }

        match page.continuation {
            Some(token) => continuation = Some(token),
            None => return Ok(items),
        }
    }
}
