pub mod batcher;
pub mod channel;
pub mod hub;

pub use batcher::{BatcherStats, ThrottledEventBatcher};
pub use channel::Channel;
pub use hub::{Hub, PublishedEvent};
