mod feed;
mod model;
mod store;

pub use feed::NotificationFeed;
pub use model::{ContextKind, NewNotification, Notification, NotificationContext, NotificationKind};
pub use store::{NotificationStore, Subscription};
