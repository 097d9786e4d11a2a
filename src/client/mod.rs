// Module declarations
mod builder;
mod connection;
mod core;
mod state;

// Public API exports
pub use builder::{SocketManagerBuilder, SocketManagerOptions};
pub use connection::{ConnectionState, ConnectionStatus};
pub use core::SocketManager;
pub(crate) use state::ManagerState;
