//! Cancellation and progress tracking. Every in-flight request is tracked
//! by the [`dls_worker::TaskId`] of the scheduler task running it;
//! `$/cancelRequest` looks the id up and cancels that task. Work-done
//! progress tokens are tracked separately so a client can cancel via
//! either `$/cancelRequest` (by request id) or by dropping interest in a
//! progress token.

use std::collections::HashMap;

use dls_lsp::progress::ProgressToken;
use dls_rpc::RequestId;
use dls_worker::TaskId;
use tokio_util::sync::CancellationToken;

/// Maps in-flight request ids to the scheduler task running them. A
/// request not present here (already finished, or never existed) makes
/// `$/cancelRequest` silently a no-op.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    tasks: HashMap<RequestId, TaskId>,
}

impl CancellationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `task_id` is the scheduler task running `id`. Replaces
    /// any stale entry for a reused id.
    pub fn begin(&mut self, id: RequestId, task_id: TaskId) {
        self.tasks.insert(id, task_id);
    }

    /// Mark `id` as finished, dropping its task mapping. Called once the
    /// task's future resolves, regardless of outcome.
    pub fn end(&mut self, id: &RequestId) {
        self.tasks.remove(id);
    }

    /// The scheduler task currently running `id`, if any.
    #[must_use]
    pub fn task_id(&self, id: &RequestId) -> Option<TaskId> {
        self.tasks.get(id).copied()
    }

    #[must_use]
    pub fn is_in_flight(&self, id: &RequestId) -> bool {
        self.tasks.contains_key(id)
    }
}

/// Tracks the set of progress tokens a client has asked to be notified
/// against via `window/workDoneProgress/create`, and which have since been
/// cancelled via `window/workDoneProgress/cancel`.
#[derive(Debug, Default)]
pub struct ProgressRegistry {
    created: HashMap<ProgressToken, CancellationToken>,
}

impl ProgressRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, token: ProgressToken) -> CancellationToken {
        let cancel = CancellationToken::new();
        self.created.insert(token, cancel.clone());
        cancel
    }

    pub fn cancel(&self, token: &ProgressToken) -> bool {
        match self.created.get(token) {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, token: &ProgressToken) {
        self.created.remove(token);
    }
}
