//! # Jaaz Realtime
//!
//! Socket.IO connection manager and notification store for the Jaaz canvas client.
//!
//! ## Example
//!
//! ```no_run
//! use jaaz_realtime::{NotificationStore, SocketManager, SocketManagerOptions, SocketProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = SocketManager::new("http://localhost:57988", SocketManagerOptions::default())?;
//!     let provider = SocketProvider::new(manager, NotificationStore::with_capacity(50));
//!
//!     let context = provider.start().await;
//!     if let Some(banner) = context.status_message() {
//!         eprintln!("{}", banner);
//!     }
//!
//!     let subscription = provider
//!         .notifications()
//!         .subscribe(|list| println!("{} notifications", list.len()));
//!
//!     tokio::signal::ctrl_c().await?;
//!     subscription.unsubscribe();
//!     provider.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod notifications;
pub mod provider;
pub mod transport;
pub mod types;

pub use client::{
    ConnectionState, ConnectionStatus, SocketManager, SocketManagerBuilder, SocketManagerOptions,
};
pub use messaging::{HandlerId, SessionEvent, SessionUpdate};
pub use notifications::{
    ContextKind, NewNotification, Notification, NotificationContext, NotificationFeed,
    NotificationKind, NotificationStore, Subscription,
};
pub use provider::{SocketContext, SocketProvider};
pub use types::{EventMessage, Result, SocketError};
