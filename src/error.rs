//! Typed error taxonomy for the coordination core.
//!
//! Every variant carries a stable `code()` string so an embedding HTTP layer
//! can map it to a wire error code without string-matching on `Display`.

use thiserror::Error;

/// A driver-reported failure (spawn/send/terminate/interrupt/getOutput).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverFailure {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("agent {agent_id} not found")]
    UnknownAgent { agent_id: String },

    #[error("agent {agent_id} already exists")]
    AgentAlreadyExists { agent_id: String },

    #[error("invalid transition for {agent_id}: {from:?} -> {to:?}")]
    InvalidStateTransition {
        agent_id: String,
        from: String,
        to: String,
        valid_targets: Vec<String>,
    },

    #[error("agent {agent_id} is not alive (state {state})")]
    AgentNotAlive { agent_id: String, state: String },

    #[error("driver error for {agent_id}: {source:?}")]
    Driver {
        agent_id: String,
        source: DriverFailure,
    },

    #[error("no pool for provider {provider} in workspace {workspace_id}")]
    NoPoolForProvider {
        workspace_id: String,
        provider: String,
    },

    #[error("no available account profile for {provider} in workspace {workspace_id}")]
    NoAvailableProfile {
        workspace_id: String,
        provider: String,
    },

    #[error("internal invariant violation: {0}")]
    InvariantViolation(String),
}

impl CoreError {
    /// Stable machine-readable code for HTTP/RPC callers.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::UnknownAgent { .. } => "unknown_agent",
            CoreError::AgentAlreadyExists { .. } => "agent_already_exists",
            CoreError::InvalidStateTransition { .. } => "invalid_state_transition",
            CoreError::AgentNotAlive { .. } => "agent_not_alive",
            CoreError::Driver { .. } => "driver_error",
            CoreError::NoPoolForProvider { .. } => "no_pool_for_provider",
            CoreError::NoAvailableProfile { .. } => "no_available_profile",
            CoreError::InvariantViolation(_) => "internal_invariant_violation",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
