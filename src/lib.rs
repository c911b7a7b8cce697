//! Coordination core for orchestrating long-lived autonomous coding agents.
//!
//! This crate implements the four tightly-coupled subsystems the rest of
//! the gateway is built around: the agent lifecycle state machine, the
//! file-reservation conflict engine, throttled event fan-out, and account
//! pool rotation. Everything else — the HTTP surface, auth, persistent
//! storage, the agent driver, and the WebSocket hub — is consumed through
//! narrow capability traits (`Driver`, `Storage`, `Hub`) defined at this
//! crate's boundary; no concrete adapter ships here.
//!
//! Per the design notes, nothing in this crate is a global singleton —
//! callers construct one `CoordinationCore` at startup and pass it (or its
//! pieces) explicitly to every handler.

pub mod account;
pub mod agents;
pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod pattern;
pub mod reservation;
pub mod storage;

use std::sync::Arc;

use account::AccountPool;
use agents::registry::AgentRegistry;
use config::CoreConfig;
use lifecycle::fsm::LifecycleFsm;
use reservation::conflict::ConflictEngine;
use reservation::ReservationRegistry;

/// The process-wide bundle of stateful components an embedder constructs
/// once at startup. `AgentService` and `ThrottledEventBatcher` are
/// deliberately not included here — they close over a `Driver`/sink that
/// only the embedder can provide — but they're built from the pieces held
/// here.
pub struct CoordinationCore {
    pub lifecycle: Arc<LifecycleFsm>,
    pub reservations: Arc<ReservationRegistry>,
    pub conflicts: Arc<ConflictEngine>,
    pub agents: Arc<AgentRegistry>,
    pub accounts: Arc<AccountPool>,
    pub config: CoreConfig,
}

impl CoordinationCore {
    pub fn new(config: CoreConfig) -> Self {
        let reservations = Arc::new(ReservationRegistry::new());
        Self {
            lifecycle: Arc::new(LifecycleFsm::new(config.lifecycle.clone())),
            conflicts: Arc::new(ConflictEngine::new(Arc::clone(&reservations))),
            reservations,
            agents: Arc::new(AgentRegistry::new()),
            accounts: Arc::new(AccountPool::new(config.account_pool.clone())),
            config,
        }
    }

    /// Start the lifecycle's periodic stale-terminal cleanup job. Returns
    /// a handle the caller must keep alive and can `stop()` on shutdown.
    pub fn spawn_cleanup_job(&self) -> lifecycle::fsm::CleanupHandle {
        lifecycle::fsm::spawn_cleanup_job(
            Arc::clone(&self.lifecycle),
            self.config.lifecycle.cleanup_interval_secs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn core_wires_conflict_engine_to_shared_registry() {
        let core = CoordinationCore::new(CoreConfig::default());
        core.reservations
            .register(reservation::Reservation {
                id: "r1".into(),
                project_id: "P".into(),
                requester_id: "A".into(),
                patterns: vec!["src/**".into()],
                exclusive: true,
                created_at: chrono::Utc::now(),
                expires_at: chrono::Utc::now() + chrono::Duration::minutes(30),
            })
            .await;

        let result = core
            .conflicts
            .check_conflicts("P", "B", &["src/a.ts".to_string()], true)
            .await;
        assert!(result.has_conflicts);
    }
}
