//! Cooperative task scheduling: every request handler and background job
//! runs as a `!Send` future on one `LocalSet`, cancelled through a
//! [`CancellationToken`] rather than killed, and yielding at explicit
//! points instead of being preempted — no task ever awaits while holding
//! a lock (`await_holding_lock = "deny"` in the workspace lints).

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("task {0:?} is not tracked by this scheduler")]
    UnknownTask(TaskId),
}

struct TaskEntry {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    tasks: HashMap<TaskId, TaskEntry>,
}

/// Owns every in-flight task spawned on the server's single-threaded
/// executor. Dropping a `Scheduler` does not abort its tasks; call
/// [`Scheduler::shutdown`] to cancel and drain them deterministically.
#[derive(Default, Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<Inner>>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a `!Send` future onto the current `LocalSet`, tracked under a
    /// fresh [`TaskId`] with its own cancellation token. `make_future` is
    /// handed a clone of that token so the handler can check it (or race
    /// it via `tokio::select!`) from inside its own body. Must be called
    /// from within a `LocalSet` context — the framework's event loop
    /// enters one at startup and never leaves it.
    pub fn spawn_local<F>(&self, make_future: impl FnOnce(CancellationToken) -> F) -> TaskId
    where
        F: Future<Output = ()> + 'static,
    {
        let cancel = CancellationToken::new();
        let fut = make_future(cancel.clone());
        let join = tokio::task::spawn_local(fut);

        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = TaskId(inner.next_id);
        inner.tasks.insert(id, TaskEntry { cancel, join });
        id
    }

    /// Request cancellation of a tracked task. Idempotent: cancelling an
    /// already-cancelled or already-finished task is not an error, since
    /// the cancel-after-completion race is expected rather than
    /// exceptional.
    pub fn cancel(&self, id: TaskId) -> Result<(), SchedulerError> {
        let inner = self.inner.borrow();
        let entry = inner.tasks.get(&id).ok_or(SchedulerError::UnknownTask(id))?;
        entry.cancel.cancel();
        Ok(())
    }

    #[must_use]
    pub fn is_finished(&self, id: TaskId) -> bool {
        self.inner
            .borrow()
            .tasks
            .get(&id)
            .map_or(true, |entry| entry.join.is_finished())
    }

    /// Drop the bookkeeping for tasks that have already finished. Handlers
    /// call this periodically rather than on every completion, since the
    /// scheduler itself is never notified of completion directly.
    pub fn reap_finished(&self) {
        self.inner.borrow_mut().tasks.retain(|_, entry| !entry.join.is_finished());
    }

    /// Cancel every tracked task and wait for each to return control
    /// cooperatively, in spawn order. Used by the server lifecycle's
    /// `shutdown` transition to guarantee no handler is still running once
    /// the request completes.
    pub async fn shutdown(&self) {
        let ids: Vec<TaskId> = {
            let inner = self.inner.borrow();
            inner.tasks.keys().copied().collect()
        };
        for id in &ids {
            if let Some(entry) = self.inner.borrow().tasks.get(id) {
                entry.cancel.cancel();
            }
        }
        let joins: Vec<JoinHandle<()>> = {
            let mut inner = self.inner.borrow_mut();
            ids.iter().filter_map(|id| inner.tasks.remove(id)).map(|e| e.join).collect()
        };
        for join in joins {
            let _ = join.await;
        }
    }

    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.inner.borrow().tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc as StdRc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::task::LocalSet;

    #[tokio::test]
    async fn cancelled_task_observes_its_token() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let scheduler = Scheduler::new();
                let ran_to_completion = StdRc::new(AtomicBool::new(false));
                let flag = ran_to_completion.clone();

                let id = scheduler.spawn_local(move |cancel| async move {
                    cancel.cancelled().await;
                    flag.store(true, Ordering::SeqCst);
                });

                scheduler.cancel(id).unwrap();
                tokio::task::yield_now().await;
                tokio::task::yield_now().await;

                assert!(ran_to_completion.load(Ordering::SeqCst));
            })
            .await;
    }

    #[tokio::test]
    async fn shutdown_drains_every_tracked_task() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let scheduler = Scheduler::new();
                for _ in 0..3 {
                    scheduler.spawn_local(|cancel| async move {
                        cancel.cancelled().await;
                    });
                }
                assert_eq!(scheduler.in_flight_count(), 3);
                scheduler.shutdown().await;
                assert_eq!(scheduler.in_flight_count(), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn cancelling_unknown_task_is_an_error() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let scheduler = Scheduler::new();
                let bogus = scheduler.spawn_local(|_| async {});
                scheduler.shutdown().await;
                assert!(scheduler.cancel(bogus).is_err());
            })
            .await;
    }
}
