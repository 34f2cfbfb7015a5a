//! Change notification: directory watching and consumer callbacks.

pub mod subscriber;
pub mod watcher;

pub use subscriber::{SubscriberRegistry, SubscriptionHandle};
pub use watcher::DirWatcher;
