//! Continuation-pair call convention
//!
//! Traced operations are futures. Callers written against success/failure
//! callbacks drive the same future through [`with_continuations`], so the
//! trace events and the delivered value are identical in both conventions.

use crate::{Error, Result};
use std::future::Future;
use tokio::task::JoinHandle;

/// Run `operation` on the runtime and deliver its outcome to exactly one of
/// `on_success` / `on_failure`
///
/// ```
/// use rtctrace::with_continuations;
///
/// # tokio_test::block_on(async {
/// let handle = with_continuations(
///     async { Ok(42) },
///     |value| assert_eq!(value, 42),
///     |e| panic!("unexpected failure: {}", e),
/// );
/// handle.await.unwrap();
/// # });
/// ```
pub fn with_continuations<T, Fut, S, F>(
    operation: Fut,
    on_success: S,
    on_failure: F,
) -> JoinHandle<()>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    S: FnOnce(T) + Send + 'static,
    F: FnOnce(Error) + Send + 'static,
{
    tokio::spawn(async move {
        match operation.await {
            Ok(value) => on_success(value),
            Err(e) => on_failure(e),
        }
    })
}
