//! Settle-all batch execution.

use std::future::Future;

/// Process `items` in fixed-size batches of `max_concurrency`.
///
/// Within a batch every item runs concurrently and to completion; one
/// item's outcome never affects another's. Results come back in input
/// order. A `max_concurrency` of 0 is treated as 1.
pub async fn process_in_batches<T, R, F, Fut>(
    items: Vec<T>,
    max_concurrency: usize,
    handler: F,
) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let batch_size = max_concurrency.max(1);
    let mut results = Vec::with_capacity(items.len());

    let mut queue = items.into_iter();
    loop {
        let batch: Vec<T> = queue.by_ref().take(batch_size).collect();
        if batch.is_empty() {
            break;
        }
        let outcomes = futures::future::join_all(batch.into_iter().map(&handler)).await;
        results.extend(outcomes);
    }

    results
}
