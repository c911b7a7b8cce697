//! `AgentService` — the public contract consumed by the HTTP layer.
//! Orchestrates the driver, the lifecycle FSM, and the agent registry.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{CoreError, CoreResult, DriverFailure};
use crate::lifecycle::fsm::LifecycleFsm;

use super::driver::{Driver, OutputLine, SendResult};
use super::id::generate_agent_id;
use super::registry::AgentRegistry;

pub struct AgentService {
    driver: Arc<dyn Driver>,
    fsm: Arc<LifecycleFsm>,
    registry: Arc<AgentRegistry>,
}

impl AgentService {
    pub fn new(driver: Arc<dyn Driver>, fsm: Arc<LifecycleFsm>, registry: Arc<AgentRegistry>) -> Self {
        Self {
            driver,
            fsm,
            registry,
        }
    }

    /// Spawn a new agent: allocate an id, call the driver, register it,
    /// and walk the FSM from `Spawning` through to `Ready`.
    pub async fn spawn(&self, config: Value) -> CoreResult<String> {
        let agent_id = generate_agent_id();
        self.fsm.initialize(&agent_id).await?;

        match self.driver.spawn(config).await {
            Ok(spawned) => {
                self.registry.register(&agent_id, spawned.id.clone()).await;
                self.fsm.mark_ready(&agent_id).await?;
                Ok(agent_id)
            }
            Err(failure) => {
                self.fail(&agent_id, failure.clone()).await;
                Err(CoreError::Driver {
                    agent_id,
                    source: failure,
                })
            }
        }
    }

    /// Send content to a running agent. Requires the agent to be alive.
    pub async fn send(&self, agent_id: &str, content: &str) -> CoreResult<SendResult> {
        self.require_alive(agent_id).await?;

        self.fsm
            .mark_executing(agent_id, None)
            .await
            .ok();

        match self.driver.send(agent_id, content).await {
            Ok(result) => {
                self.registry.record_message_sent(agent_id).await;
                self.fsm.mark_idle(agent_id, None).await.ok();
                Ok(result)
            }
            Err(failure) => {
                self.fail(agent_id, failure.clone()).await;
                Err(CoreError::Driver {
                    agent_id: agent_id.to_string(),
                    source: failure,
                })
            }
        }
    }

    /// Terminate an agent. Requires the agent to exist (need not be alive —
    /// terminate is how you clean up a stuck one too).
    pub async fn terminate(&self, agent_id: &str, graceful: bool) -> CoreResult<()> {
        if !self.registry.contains(agent_id).await {
            return Err(CoreError::UnknownAgent {
                agent_id: agent_id.to_string(),
            });
        }

        self.fsm.mark_terminating(agent_id).await?;

        match self.driver.terminate(agent_id, graceful).await {
            Ok(()) => {
                self.fsm.mark_terminated(agent_id).await?;
                Ok(())
            }
            Err(failure) => {
                self.fail(agent_id, failure.clone()).await;
                Err(CoreError::Driver {
                    agent_id: agent_id.to_string(),
                    source: failure,
                })
            }
        }
    }

    pub async fn interrupt(&self, agent_id: &str) -> CoreResult<()> {
        self.require_alive(agent_id).await?;
        self.driver
            .interrupt(agent_id)
            .await
            .map_err(|failure| CoreError::Driver {
                agent_id: agent_id.to_string(),
                source: failure,
            })
    }

    pub async fn get_output(
        &self,
        agent_id: &str,
        since: Option<chrono::DateTime<chrono::Utc>>,
        limit: Option<usize>,
    ) -> CoreResult<Vec<OutputLine>> {
        if !self.registry.contains(agent_id).await {
            return Err(CoreError::UnknownAgent {
                agent_id: agent_id.to_string(),
            });
        }
        self.driver
            .get_output(agent_id, since, limit)
            .await
            .map_err(|failure| CoreError::Driver {
                agent_id: agent_id.to_string(),
                source: failure,
            })
    }

    async fn require_alive(&self, agent_id: &str) -> CoreResult<()> {
        let state = self.fsm.current_state(agent_id).await?;
        if !state.is_alive() {
            return Err(CoreError::AgentNotAlive {
                agent_id: agent_id.to_string(),
                state: state.to_string(),
            });
        }
        Ok(())
    }

    async fn fail(&self, agent_id: &str, failure: DriverFailure) {
        // Best-effort: if the FSM is already in a terminal state the
        // transition is rejected, which is fine — the failure is still
        // surfaced to the caller by the caller of `fail`.
        let _ = self.fsm.mark_failed(agent_id, failure).await;
    }
}
