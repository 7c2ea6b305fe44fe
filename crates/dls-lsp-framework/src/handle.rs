//! Server-wide wiring: [`ServerHandle`] ties the Router, Document Manager,
//! Lifecycle, Cancellation registry, Scheduler, and Event Bus together
//! behind one cloneable handle; [`HandlerContext`] is what an individual
//! request handler actually holds — a *weak* back-reference, so a
//! handler future that never observes its cancellation token doesn't
//! keep the whole server alive for as long as it runs.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use dls_worker::Scheduler;

use crate::cancellation::{CancellationRegistry, ProgressRegistry};
use crate::document::DocumentManager;
use crate::events::EventBusHandle;
use crate::lifecycle::Lifecycle;
use crate::router::Router;

struct ServerState {
    router: RefCell<Router>,
    documents: RefCell<DocumentManager>,
    lifecycle: RefCell<Lifecycle>,
    cancellation: RefCell<CancellationRegistry>,
    progress: RefCell<ProgressRegistry>,
    scheduler: Scheduler,
    events: EventBusHandle,
}

/// Owns every piece of server-wide state. Cloning is O(1) (an `Rc` bump);
/// all clones see the same underlying state.
#[derive(Clone)]
pub struct ServerHandle(Rc<ServerState>);

impl ServerHandle {
    #[must_use]
    pub fn new(scheduler: Scheduler, events: EventBusHandle) -> Self {
        Self(Rc::new(ServerState {
            router: RefCell::new(Router::new()),
            documents: RefCell::new(DocumentManager::new()),
            lifecycle: RefCell::new(Lifecycle::new()),
            cancellation: RefCell::new(CancellationRegistry::new()),
            progress: RefCell::new(ProgressRegistry::new()),
            scheduler,
            events,
        }))
    }

    /// Produce a weak view suitable for handing to a spawned handler.
    #[must_use]
    pub fn context(&self) -> HandlerContext {
        HandlerContext {
            server: Rc::downgrade(&self.0),
        }
    }

    #[must_use]
    pub fn router(&self) -> &RefCell<Router> {
        &self.0.router
    }

    #[must_use]
    pub fn documents(&self) -> &RefCell<DocumentManager> {
        &self.0.documents
    }

    #[must_use]
    pub fn lifecycle(&self) -> &RefCell<Lifecycle> {
        &self.0.lifecycle
    }

    #[must_use]
    pub fn cancellation(&self) -> &RefCell<CancellationRegistry> {
        &self.0.cancellation
    }

    #[must_use]
    pub fn progress(&self) -> &RefCell<ProgressRegistry> {
        &self.0.progress
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.0.scheduler
    }

    #[must_use]
    pub fn events(&self) -> &EventBusHandle {
        &self.0.events
    }
}

#[derive(Debug, thiserror::Error)]
#[error("server has already shut down")]
pub struct ServerGone;

/// A weak reference to server-wide state, handed to spawned request
/// handlers instead of a strong [`ServerHandle`].
#[derive(Clone)]
pub struct HandlerContext {
    server: Weak<ServerState>,
}

impl HandlerContext {
    /// Upgrade to a strong handle for the duration of one handler step.
    /// Fails only if the server has already torn down its state, which a
    /// well-behaved handler should treat as "stop, there is nothing left
    /// to reply into."
    pub fn upgrade(&self) -> Result<ServerHandle, ServerGone> {
        self.server.upgrade().map(ServerHandle).ok_or(ServerGone)
    }
}
