//! The driver capability — spawns, feeds, reads, and tears down an agent
//! process. The coordination core never implements this; it only consumes
//! it (§6, §1 Non-goals: "the agent driver itself ... is a capability
//! interface the lifecycle core consumes").

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DriverFailure;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnedAgent {
    pub id: String,
    pub activity_state: String,
    pub driver_type: String,
    pub started_at: DateTime<Utc>,
    pub config: serde_json::Value,
    pub last_activity_at: DateTime<Utc>,
    pub token_usage: TokenUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResult {
    pub message_id: String,
    pub queued: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLineType {
    Stdout,
    Stderr,
    ToolCall,
    ToolResult,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputLine {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub line_type: OutputLineType,
    pub content: serde_json::Value,
}

pub type DriverResult<T> = Result<T, DriverFailure>;

/// The capability the `AgentService` delegates side-effecting calls to.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn spawn(&self, config: serde_json::Value) -> DriverResult<SpawnedAgent>;
    async fn send(&self, agent_id: &str, content: &str) -> DriverResult<SendResult>;
    async fn terminate(&self, agent_id: &str, graceful: bool) -> DriverResult<()>;
    async fn interrupt(&self, agent_id: &str) -> DriverResult<()>;
    async fn get_output(
        &self,
        agent_id: &str,
        since: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> DriverResult<Vec<OutputLine>>;
}
