//! `Hub` — the WebSocket fan-out sink the core treats as an opaque
//! capability (§4.7). Subscriber management, ring buffers, and backfill
//! are out of scope; only the publish contract lives in this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::channel::Channel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedEvent {
    pub id: String,
    pub cursor: u64,
}

#[async_trait]
pub trait Hub: Send + Sync {
    async fn publish(
        &self,
        channel: Channel,
        event_type: &str,
        payload: Value,
        metadata: Value,
    ) -> PublishedEvent;
}
