//! Canonical `agentId -> (driver handle, stats, createdAt)` mapping.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Opaque handle returned by the driver at spawn time. The registry does
/// not interpret it — it's whatever the driver needs to address the
/// process later (pid, socket, task handle).
pub type DriverHandle = String;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentStats {
    pub messages_received: u64,
    pub messages_sent: u64,
    pub tool_calls: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRegistryEntry {
    pub agent_id: String,
    pub driver_handle: DriverHandle,
    pub created_at: DateTime<Utc>,
    pub stats: AgentStats,
}

pub struct AgentRegistry {
    entries: RwLock<HashMap<String, AgentRegistryEntry>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, agent_id: &str, driver_handle: DriverHandle) {
        self.entries.write().await.insert(
            agent_id.to_string(),
            AgentRegistryEntry {
                agent_id: agent_id.to_string(),
                driver_handle,
                created_at: Utc::now(),
                stats: AgentStats::default(),
            },
        );
    }

    pub async fn get(&self, agent_id: &str) -> Option<AgentRegistryEntry> {
        self.entries.read().await.get(agent_id).cloned()
    }

    pub async fn contains(&self, agent_id: &str) -> bool {
        self.entries.read().await.contains_key(agent_id)
    }

    pub async fn remove(&self, agent_id: &str) -> Option<AgentRegistryEntry> {
        self.entries.write().await.remove(agent_id)
    }

    pub async fn record_message_sent(&self, agent_id: &str) {
        if let Some(entry) = self.entries.write().await.get_mut(agent_id) {
            entry.stats.messages_sent += 1;
        }
    }

    pub async fn record_message_received(&self, agent_id: &str) {
        if let Some(entry) = self.entries.write().await.get_mut(agent_id) {
            entry.stats.messages_received += 1;
        }
    }

    pub async fn record_tool_call(&self, agent_id: &str) {
        if let Some(entry) = self.entries.write().await.get_mut(agent_id) {
            entry.stats.tool_calls += 1;
        }
    }

    pub async fn list(&self) -> Vec<AgentRegistryEntry> {
        self.entries.read().await.values().cloned().collect()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedAgentRegistry = Arc<AgentRegistry>;
