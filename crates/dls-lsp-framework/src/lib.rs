pub mod cancellation;
pub mod document;
pub mod events;
pub mod handle;
pub mod lifecycle;
pub mod router;
pub mod transport;

pub use cancellation::{CancellationRegistry, ProgressRegistry};
pub use document::{Document, DocumentError, DocumentManager, DocumentSnapshot, EolKind};
pub use events::{EventBus, EventBusHandle, ServerEvent};
pub use handle::{HandlerContext, ServerGone, ServerHandle};
pub use lifecycle::{Lifecycle, LifecycleError, LifecycleState};
pub use router::{OutboundMessage, OutboundSender, Router};
pub use transport::{process_one, write_message};
