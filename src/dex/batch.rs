//! Concurrency-limited batch execution against the upstream service.

use futures::future::join_all;
use std::future::Future;

/// Maps `items` through `f` with at most `concurrency` futures in flight.
///
/// Items are split into consecutive chunks of `concurrency`; each chunk runs
/// fully concurrent and is awaited to completion before the next chunk starts,
/// so the bound is a hard ceiling rather than a sliding window. Output order
/// always matches input order regardless of completion order within a chunk.
///
/// The mapper does not catch anything: callers that expect per-item failures
/// return an `Option` or sentinel from `f` instead of letting errors escape.
pub async fn map_batches<T, R, F, Fut>(items: Vec<T>, concurrency: usize, f: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let concurrency = concurrency.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut remaining = items.into_iter();

    loop {
        let chunk: Vec<T> = remaining.by_ref().take(concurrency).collect();
        if chunk.is_empty() {
            break;
        }
        results.extend(join_all(chunk.into_iter().map(&f)).await);
    }

    results
}
