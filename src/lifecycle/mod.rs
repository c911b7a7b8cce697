//! Agent lifecycle state machine — closed states, validated transitions,
//! bounded history, and a snapshot-dispatch event bus.

pub mod event_bus;
pub mod fsm;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::DriverFailure;

/// Closed set of lifecycle states. `Terminated`/`Failed` are terminal (no
/// outgoing transitions); `Terminating` is non-terminal but not "alive".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Spawning,
    Initializing,
    Ready,
    Executing,
    Paused,
    Terminating,
    Terminated,
    Failed,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Terminated | LifecycleState::Failed)
    }

    /// Alive means the agent can accept commands — excludes terminal states
    /// and `Terminating` (already winding down).
    pub fn is_alive(&self) -> bool {
        !self.is_terminal() && !matches!(self, LifecycleState::Terminating)
    }

    pub fn valid_targets(&self) -> &'static [LifecycleState] {
        use LifecycleState::*;
        match self {
            Spawning => &[Initializing, Terminating, Failed],
            Initializing => &[Ready, Terminating, Failed],
            Ready => &[Executing, Paused, Terminating, Failed],
            Executing => &[Ready, Paused, Terminating, Failed],
            Paused => &[Ready, Terminating, Failed],
            Terminating => &[Terminated, Failed],
            Terminated => &[],
            Failed => &[],
        }
    }

    pub fn can_transition_to(&self, target: LifecycleState) -> bool {
        self.valid_targets().contains(&target)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Closed set of causes for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    SpawnStarted,
    InitComplete,
    UserAction,
    CommandStarted,
    CommandComplete,
    PauseRequested,
    ResumeRequested,
    TerminateRequested,
    TerminateComplete,
    Error,
    Timeout,
    HealthCheckFailed,
    DriverError,
    ResourceLimit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub previous_state: LifecycleState,
    pub new_state: LifecycleState,
    pub timestamp: DateTime<Utc>,
    pub reason: TransitionReason,
    pub correlation_id: Option<String>,
    pub error: Option<DriverFailure>,
    pub metadata: Option<serde_json::Value>,
}

/// Per-agent state record owned by the `LifecycleFsm`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStateRecord {
    pub agent_id: String,
    pub current_state: LifecycleState,
    pub state_entered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub history: VecDeque<StateTransition>,
}

impl AgentStateRecord {
    pub fn history_vec(&self) -> Vec<StateTransition> {
        self.history.iter().cloned().collect()
    }
}

/// Event emitted to the `StateEventBus` on every successful transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangeEvent {
    pub agent_id: String,
    pub previous_state: LifecycleState,
    pub new_state: LifecycleState,
    pub reason: TransitionReason,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<String>,
    pub error: Option<DriverFailure>,
}
