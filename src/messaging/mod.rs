// Messaging module - handler registry, inbound routing and typed session events
pub mod registry;
pub mod router;
pub mod session;

pub use registry::{EventRegistry, HandlerId};
pub use router::EventRouter;
pub use session::{SessionEvent, SessionUpdate};
