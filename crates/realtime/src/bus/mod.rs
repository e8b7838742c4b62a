mod comment_bus;
mod config;
mod error;
mod subscription;

pub use comment_bus::CommentBus;
pub use config::{BusConfig, DEFAULT_BUFFER_SIZE};
pub use error::BusError;
pub use subscription::{Subscription, SubscriptionId};
