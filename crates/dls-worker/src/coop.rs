//! Cooperative yield and deadline helpers. The scheduler trusts every
//! handler to call [`yield_point`] at natural suspension boundaries rather
//! than relying on preemption — there is none, on a single-threaded
//! executor.

use std::future::Future;
use std::time::Duration;

use tokio::time::error::Elapsed;

/// Yield control back to the executor so other tasks on the same
/// `LocalSet` get a turn. A no-op from the caller's perspective beyond
/// that — it does not sleep and does not check cancellation.
pub async fn yield_point() {
    tokio::task::yield_now().await;
}

/// Run `fut` to completion or until `duration` elapses, whichever comes
/// first — used for a request's timeout so a slow handler can't hang the
/// server indefinitely.
pub async fn with_deadline<F>(duration: Duration, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    tokio::time::timeout(duration, fut).await
}
