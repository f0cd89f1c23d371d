//! Join combinators for concurrently launched operations
//!
//! Every fan-out in this crate goes through one of two joins:
//!
//! - [`join_all_or_nothing`]: the joined result fails as soon as any member
//!   fails. Output order always equals input order.
//! - [`join_isolated`]: every member runs to completion and outcomes are
//!   partitioned per key into successes and failures.
//!
//! Neither combinator spawns tasks. The futures are polled concurrently on
//! the caller's task, so outstanding I/O overlaps without any shared state.

use std::collections::BTreeMap;
use std::future::Future;

use futures::future::{join_all, try_join_all};

/// Runs all futures concurrently and returns their outputs in input order.
///
/// The first error aborts the join; the remaining futures are dropped and no
/// partial result is surfaced.
pub async fn join_all_or_nothing<I, F, T, E>(futures: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    try_join_all(futures).await
}

/// Runs all keyed futures concurrently and partitions their outcomes.
///
/// A failure only affects its own key. When the same key is given twice the
/// later outcome replaces the earlier one in whichever map it lands.
pub async fn join_isolated<I, F, K, T, E>(keyed: I) -> (BTreeMap<K, T>, BTreeMap<K, E>)
where
    I: IntoIterator<Item = (K, F)>,
    F: Future<Output = Result<T, E>>,
    K: Ord,
{
    let (keys, futures): (Vec<K>, Vec<F>) = keyed.into_iter().unzip();
    let outcomes = join_all(futures).await;

    let mut successes = BTreeMap::new();
    let mut failures = BTreeMap::new();
    for (key, outcome) in keys.into_iter().zip(outcomes) {
        match outcome {
            Ok(value) => {
                failures.remove(&key);
                successes.insert(key, value);
            }
            Err(err) => {
                successes.remove(&key);
                failures.insert(key, err);
            }
        }
    }
    (successes, failures)
}
