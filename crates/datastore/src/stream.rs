//! Lazy transformations over asynchronous sequences.
//!
//! These are the building blocks of the query pipeline. Each function takes
//! any [`Stream`] and returns a new boxed stream, so the output of one stage
//! is valid input to the next:
//!
//! ```
//! use futures::{StreamExt, stream};
//! use inferadb_common_datastore::stream::{filter, map, take};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let evens = filter(stream::iter(0..), |n: &u32| n % 2 == 0);
//! let squares = map(evens, |n| n * n);
//! let first: Vec<u32> = take(squares, 3).collect().await;
//! assert_eq!(first, vec![0, 4, 16]);
//! # });
//! ```
//!
//! # Laziness
//!
//! [`map`], [`filter`], [`take`] and [`stop_after_error`] pull one upstream
//! element per downstream request and work on unbounded input.
//!
//! [`sort_all`] and [`try_sort_all`] are the exception: they drain the
//! whole upstream into memory before yielding anything. Apply them only to
//! sequences known to terminate; memory use is proportional to the number
//! of elements that reach the stage.

use std::{future, pin::pin};

use async_stream::stream;
use futures::{Stream, StreamExt, stream::BoxStream};
use tracing::trace;

/// Applies `f` to every element, in order.
///
/// `f` runs at most once per element, when that element is pulled.
pub fn map<'a, S, T, U, F>(seq: S, f: F) -> BoxStream<'a, U>
where
    S: Stream<Item = T> + Send + 'a,
    F: FnMut(T) -> U + Send + 'a,
{
    seq.map(f).boxed()
}

/// Yields only the elements for which `predicate` returns `true`.
pub fn filter<'a, S, T, F>(seq: S, mut predicate: F) -> BoxStream<'a, T>
where
    S: Stream<Item = T> + Send + 'a,
    T: Send + 'a,
    F: FnMut(&T) -> bool + Send + 'a,
{
    seq.filter(move |item| future::ready(predicate(item))).boxed()
}

/// Yields at most the first `n` elements, then ends.
///
/// Upstream is not polled again once `n` elements have been produced, and
/// not polled at all when `n` is zero.
pub fn take<'a, S, T>(seq: S, n: usize) -> BoxStream<'a, T>
where
    S: Stream<Item = T> + Send + 'a,
{
    seq.take(n).boxed()
}

/// Drains `seq`, passes every element to `sorter` once, and yields the result.
///
/// Nothing is yielded until upstream has ended.
pub fn sort_all<'a, S, T, F>(seq: S, sorter: F) -> BoxStream<'a, T>
where
    S: Stream<Item = T> + Send + 'a,
    T: Send + 'a,
    F: FnOnce(Vec<T>) -> Vec<T> + Send + 'a,
{
    Box::pin(stream! {
        let collected: Vec<T> = seq.collect().await;
        trace!(count = collected.len(), "sort_all drained upstream");
        for item in sorter(collected) {
            yield item;
        }
    })
}

/// Fallible [`sort_all`].
///
/// Drains the `Ok` values of `seq` and sorts them. If upstream yields an
/// `Err`, that error is yielded immediately, `sorter` is never called and the
/// stream ends.
pub fn try_sort_all<'a, S, T, E, F>(seq: S, sorter: F) -> BoxStream<'a, Result<T, E>>
where
    S: Stream<Item = Result<T, E>> + Send + 'a,
    T: Send + 'a,
    E: Send + 'a,
    F: FnOnce(Vec<T>) -> Vec<T> + Send + 'a,
{
    Box::pin(stream! {
        let mut seq = pin!(seq);
        let mut collected = Vec::new();
        while let Some(item) = seq.next().await {
            match item {
                Ok(value) => collected.push(value),
                Err(err) => {
                    yield Err(err);
                    return;
                },
            }
        }
        trace!(count = collected.len(), "try_sort_all drained upstream");
        for value in sorter(collected) {
            yield Ok(value);
        }
    })
}

/// Ends a fallible stream right after its first `Err`.
pub fn stop_after_error<'a, S, T, E>(seq: S) -> BoxStream<'a, Result<T, E>>
where
    S: Stream<Item = Result<T, E>> + Send + 'a,
    T: Send + 'a,
    E: Send + 'a,
{
    Box::pin(stream! {
        let mut seq = pin!(seq);
        while let Some(item) = seq.next().await {
            let failed = item.is_err();
            yield item;
            if failed {
                break;
            }
        }
    })
}
