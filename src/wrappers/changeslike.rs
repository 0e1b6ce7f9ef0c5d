//! Adapter for changes-like operations (change feeds, sync, replication).
//!
//! These report terminal failure through their start: either the async start
//! is rejected, or, for the emitter-style `deferred` form, the feed ends with
//! a single error before any item. Either way the guard check runs once,
//! before the underlying stream is built.

use std::future::Future;

use futures_util::stream::{self, StreamExt};

use crate::database::Feed;
use crate::error::DbResult;

/// Await `check`, then build and await the start future. `start` is only
/// called once the check has passed.
pub async fn start<T, C, F, Fut>(check: C, start: F) -> DbResult<Feed<T>>
where
    C: Future<Output = DbResult<()>>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = DbResult<Feed<T>>>,
{
    check.await?;
    start().await
}

/// Return a feed immediately; `start` runs on first poll. A failed start
/// becomes the only item of the feed. Dropping the feed before it is polled
/// means `start` never runs.
pub fn deferred<T, Fut>(start: Fut) -> Feed<T>
where
    T: Send + 'static,
    Fut: Future<Output = DbResult<Feed<T>>> + Send + 'static,
{
    stream::once(start)
        .flat_map(|res| match res {
            Ok(feed) => feed,
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        })
        .boxed()
}
