//! Asynchronous delivery of lookup outcomes.
//!
//! Every cached operation answers through one of two paths: a value that is
//! already known goes through [`deferred`], a value still being fetched goes
//! through a oneshot channel awaited with [`await_outcome`]. Both yield to the
//! scheduler before producing, so a caller never observes an answer on the
//! first poll, whether it was a hit or a miss.

use termcache_core::{CacheError, CacheResult};
use tokio::sync::oneshot;

/// Sending half held by the cache for a waiting caller.
pub type Completion<T, E> = oneshot::Sender<Result<T, E>>;

/// Receiving half a waiting caller awaits.
pub type Pending<T, E> = oneshot::Receiver<Result<T, E>>;

pub fn channel<T, E>() -> (Completion<T, E>, Pending<T, E>) {
    oneshot::channel()
}

/// Delivers an outcome to one waiter. A waiter that stopped listening has
/// nothing left to receive.
pub fn resolve<T, E>(completion: Completion<T, E>, outcome: Result<T, E>) {
    let _ = completion.send(outcome);
}

/// Delivers a copy of one outcome to every waiter, in registration order.
pub fn resolve_all<T, E>(completions: Vec<Completion<T, E>>, outcome: &Result<T, E>) -> usize
where
    T: Clone,
    E: Clone,
{
    let count = completions.len();
    for completion in completions {
        resolve(completion, outcome.clone());
    }
    count
}

/// Returns an already known value after yielding once.
pub async fn deferred<T>(value: T) -> T {
    tokio::task::yield_now().await;
    value
}

/// Waits for a waiter's outcome.
pub async fn await_outcome<T, E>(pending: Pending<T, E>) -> CacheResult<T, E> {
    tokio::task::yield_now().await;
    match pending.await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CacheError::Query(err)),
        Err(_) => Err(CacheError::Abandoned),
    }
}
