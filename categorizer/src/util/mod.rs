/// Sleeping with exponential backoff.
pub mod backoff;

/// An async queue of bounded size.
pub mod bounded_queue;

use futures03::future::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;

fn abort_on_panic<T: Send + 'static>(
    f: impl Future<Output = T> + Send + 'static,
) -> impl Future<Output = T> {
    // We're crashing, unwind safety doesn't matter.
    AssertUnwindSafe(f).catch_unwind().map(|result| match result {
        Ok(output) => output,
        Err(_) => {
            println!("Panic in tokio task, aborting!");
            std::process::abort()
        }
    })
}

/// Spawn a task onto the tokio runtime. A panic in the task aborts the
/// process instead of leaving the categorizer half-running.
pub fn spawn<T: Send + 'static>(f: impl Future<Output = T> + Send + 'static) -> JoinHandle<T> {
    tokio::spawn(abort_on_panic(f))
}
