//! Concurrent-join helper for fan-out call plans
//!
//! The contract is "collect everything, pair each item with its outcome,
//! never short-circuit": one failing sub-call must not abort the batch.

use std::future::Future;

/// Drive every future to completion and return all outcomes in order
pub async fn settle_all<F, T, E>(futures: Vec<F>) -> Vec<Result<T, E>>
where
    F: Future<Output = Result<T, E>>,
{
    futures::future::join_all(futures).await
}
