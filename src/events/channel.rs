//! Fan-out key — a tagged union identifying one subscriber group.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Channel {
    AgentOutput { agent_id: String },
    AgentTools { agent_id: String },
    AgentState { agent_id: String },
    WorkspaceGraph { workspace_id: String },
    SystemHealth,
}

/// Stable wire event-type strings external clients depend on (§6).
pub mod event_type {
    pub const STATE_CHANGE: &str = "state.change";
    pub const OUTPUT_CHUNK: &str = "output.chunk";
    pub const TOOL_START: &str = "tool.start";
    pub const TOOL_END: &str = "tool.end";
    pub const GRAPH_NODE_ADDED: &str = "graph.node_added";
    pub const GRAPH_NODE_REMOVED: &str = "graph.node_removed";
    pub const GRAPH_NODE_UPDATED: &str = "graph.node_updated";
    pub const GRAPH_EDGE_ADDED: &str = "graph.edge_added";
    pub const GRAPH_EDGE_REMOVED: &str = "graph.edge_removed";
    pub const GRAPH_EDGE_UPDATED: &str = "graph.edge_updated";
    pub const GRAPH_FULL_REFRESH: &str = "graph.full_refresh";
    pub const GRAPH_STATS: &str = "graph.stats";
    pub const CHECKPOINT_COMPACTED: &str = "checkpoint.compacted";
}

/// Derive a tool event's wire type from the payload's own `type` field
/// (`tool_call` -> `tool.start`, `tool_result` -> `tool.end`).
pub fn tool_event_type(payload_type: &str) -> Option<&'static str> {
    match payload_type {
        "tool_call" => Some(event_type::TOOL_START),
        "tool_result" => Some(event_type::TOOL_END),
        _ => None,
    }
}
