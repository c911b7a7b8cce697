//! `LifecycleFsm` — registry of `AgentStateRecord`s plus validated
//! transitions and a periodic stale-terminal cleanup job.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::LifecycleConfig;
use crate::error::{CoreError, CoreResult, DriverFailure};

use super::event_bus::StateEventBus;
use super::{AgentStateRecord, LifecycleState, StateChangeEvent, StateTransition, TransitionReason};

pub struct LifecycleFsm {
    records: RwLock<HashMap<String, AgentStateRecord>>,
    bus: Arc<StateEventBus>,
    config: LifecycleConfig,
}

impl LifecycleFsm {
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            bus: Arc::new(StateEventBus::new()),
            config,
        }
    }

    pub fn bus(&self) -> Arc<StateEventBus> {
        Arc::clone(&self.bus)
    }

    /// Create a record in `Spawning`. Fails if one already exists.
    /// Triggers opportunistic stale-terminal cleanup first.
    pub async fn initialize(&self, agent_id: &str) -> CoreResult<()> {
        self.reap_stale_locked().await;

        let mut records = self.records.write().await;
        if records.contains_key(agent_id) {
            return Err(CoreError::AgentAlreadyExists {
                agent_id: agent_id.to_string(),
            });
        }
        let now = Utc::now();
        records.insert(
            agent_id.to_string(),
            AgentStateRecord {
                agent_id: agent_id.to_string(),
                current_state: LifecycleState::Spawning,
                state_entered_at: now,
                created_at: now,
                history: VecDeque::new(),
            },
        );
        debug!(agent_id, "agent record initialized in Spawning");
        Ok(())
    }

    pub async fn get(&self, agent_id: &str) -> Option<AgentStateRecord> {
        self.records.read().await.get(agent_id).cloned()
    }

    pub async fn current_state(&self, agent_id: &str) -> CoreResult<LifecycleState> {
        self.get(agent_id)
            .await
            .map(|r| r.current_state)
            .ok_or_else(|| CoreError::UnknownAgent {
                agent_id: agent_id.to_string(),
            })
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn transition(
        &self,
        agent_id: &str,
        new_state: LifecycleState,
        reason: TransitionReason,
        correlation_id: Option<String>,
        error: Option<DriverFailure>,
        metadata: Option<Value>,
    ) -> CoreResult<()> {
        let event = {
            let mut records = self.records.write().await;
            let record = records
                .get_mut(agent_id)
                .ok_or_else(|| CoreError::UnknownAgent {
                    agent_id: agent_id.to_string(),
                })?;

            if !record.current_state.can_transition_to(new_state) {
                warn!(
                    agent_id,
                    from = %record.current_state,
                    to = %new_state,
                    valid = ?record.current_state.valid_targets(),
                    "rejected invalid state transition"
                );
                return Err(CoreError::InvalidStateTransition {
                    agent_id: agent_id.to_string(),
                    from: record.current_state.to_string(),
                    to: new_state.to_string(),
                    valid_targets: record
                        .current_state
                        .valid_targets()
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                });
            }

            let now = Utc::now();
            let previous_state = record.current_state;
            let transition = StateTransition {
                previous_state,
                new_state,
                timestamp: now,
                reason,
                correlation_id: correlation_id.clone(),
                error: error.clone(),
                metadata: metadata.clone(),
            };

            if matches!(new_state, LifecycleState::Failed) {
                error!(agent_id, ?error, "agent transitioned to Failed");
            }

            record.history.push_back(transition);
            while record.history.len() > self.config.history_capacity {
                record.history.pop_front();
            }

            record.current_state = new_state;
            record.state_entered_at = now;

            StateChangeEvent {
                agent_id: agent_id.to_string(),
                previous_state,
                new_state,
                reason,
                timestamp: now,
                correlation_id,
                error,
            }
        };

        self.bus.emit(&event).await;
        Ok(())
    }

    // ── Readability helpers ─────────────────────────────────────────────

    pub async fn mark_ready(&self, agent_id: &str) -> CoreResult<()> {
        self.transition(
            agent_id,
            LifecycleState::Initializing,
            TransitionReason::SpawnStarted,
            None,
            None,
            None,
        )
        .await?;
        self.transition(
            agent_id,
            LifecycleState::Ready,
            TransitionReason::InitComplete,
            None,
            None,
            None,
        )
        .await
    }

    pub async fn mark_executing(&self, agent_id: &str, correlation_id: Option<String>) -> CoreResult<()> {
        self.transition(
            agent_id,
            LifecycleState::Executing,
            TransitionReason::CommandStarted,
            correlation_id,
            None,
            None,
        )
        .await
    }

    pub async fn mark_idle(&self, agent_id: &str, correlation_id: Option<String>) -> CoreResult<()> {
        self.transition(
            agent_id,
            LifecycleState::Ready,
            TransitionReason::CommandComplete,
            correlation_id,
            None,
            None,
        )
        .await
    }

    pub async fn mark_paused(&self, agent_id: &str) -> CoreResult<()> {
        self.transition(
            agent_id,
            LifecycleState::Paused,
            TransitionReason::PauseRequested,
            None,
            None,
            None,
        )
        .await
    }

    pub async fn mark_terminating(&self, agent_id: &str) -> CoreResult<()> {
        self.transition(
            agent_id,
            LifecycleState::Terminating,
            TransitionReason::TerminateRequested,
            None,
            None,
            None,
        )
        .await
    }

    pub async fn mark_terminated(&self, agent_id: &str) -> CoreResult<()> {
        self.transition(
            agent_id,
            LifecycleState::Terminated,
            TransitionReason::TerminateComplete,
            None,
            None,
            None,
        )
        .await
    }

    pub async fn mark_failed(&self, agent_id: &str, error: DriverFailure) -> CoreResult<()> {
        self.transition(
            agent_id,
            LifecycleState::Failed,
            TransitionReason::DriverError,
            None,
            Some(error),
            None,
        )
        .await
    }

    /// Remove terminal records whose `state_entered_at` exceeds the TTL.
    async fn reap_stale_locked(&self) -> usize {
        let ttl = chrono::Duration::seconds(self.config.stale_terminal_ttl_secs as i64);
        let cutoff = Utc::now() - ttl;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !(r.current_state.is_terminal() && r.state_entered_at <= cutoff));
        before - records.len()
    }

    /// Run one cleanup pass now (also exposed for tests / manual triggers).
    pub async fn reap_stale(&self) -> usize {
        self.reap_stale_locked().await
    }
}

/// A cancellable handle for the periodic cleanup job.
pub struct CleanupHandle {
    join: JoinHandle<()>,
}

impl CleanupHandle {
    pub fn stop(self) {
        self.join.abort();
    }
}

/// Spawn the periodic stale-terminal cleanup job. Call `stop()` on the
/// returned handle to cancel the timer.
pub fn spawn_cleanup_job(fsm: Arc<LifecycleFsm>, interval_secs: u64) -> CleanupHandle {
    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            let reaped = fsm.reap_stale().await;
            if reaped > 0 {
                debug!(reaped, "stale terminal agent records reaped");
            }
        }
    });
    CleanupHandle { join }
}
