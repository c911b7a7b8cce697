//! Per-project file reservations and the registry that tracks them.

pub mod conflict;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

/// A declared hold by an agent over a set of path globs in a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub project_id: String,
    pub requester_id: String,
    pub patterns: Vec<String>,
    pub exclusive: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ReservationStats {
    pub project_count: usize,
    pub total: usize,
    pub active: usize,
}

/// Maps `project_id -> ordered sequence of Reservation`.
///
/// Invariant: after any call returns, no project key maps to an empty
/// sequence (the key is dropped instead), and `getActive` only ever
/// returns reservations whose `expires_at > now`.
pub struct ReservationRegistry {
    by_project: RwLock<HashMap<String, Vec<Reservation>>>,
}

impl ReservationRegistry {
    pub fn new() -> Self {
        Self {
            by_project: RwLock::new(HashMap::new()),
        }
    }

    /// Append a reservation. No uniqueness check — callers (ConflictEngine)
    /// are responsible for deciding whether a reservation should proceed.
    pub async fn register(&self, res: Reservation) {
        debug!(project_id = %res.project_id, reservation_id = %res.id, "reservation registered");
        self.by_project
            .write()
            .await
            .entry(res.project_id.clone())
            .or_default()
            .push(res);
    }

    /// Remove a reservation by id. Drops the project key if it becomes empty.
    pub async fn remove(&self, project_id: &str, reservation_id: &str) -> bool {
        let mut map = self.by_project.write().await;
        let Some(list) = map.get_mut(project_id) else {
            return false;
        };
        let before = list.len();
        list.retain(|r| r.id != reservation_id);
        let removed = list.len() != before;
        if list.is_empty() {
            map.remove(project_id);
        }
        removed
    }

    /// Active (non-expired) reservations for a project, oldest-registered first.
    ///
    /// Lazily rewrites the stored list if expired entries are found, keeping
    /// the registry from growing unbounded with dead reservations.
    pub async fn get_active(&self, project_id: &str) -> Vec<Reservation> {
        let now = Utc::now();
        let mut map = self.by_project.write().await;
        let Some(list) = map.get_mut(project_id) else {
            return Vec::new();
        };
        let had_expired = list.iter().any(|r| !r.is_active(now));
        if had_expired {
            list.retain(|r| r.is_active(now));
            if list.is_empty() {
                map.remove(project_id);
                return Vec::new();
            }
        }
        map.get(project_id).cloned().unwrap_or_default()
    }

    pub async fn stats(&self) -> ReservationStats {
        let now = Utc::now();
        let map = self.by_project.read().await;
        let project_count = map.len();
        let total: usize = map.values().map(|v| v.len()).sum();
        let active: usize = map
            .values()
            .flatten()
            .filter(|r| r.is_active(now))
            .count();
        ReservationStats {
            project_count,
            total,
            active,
        }
    }
}

impl Default for ReservationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedReservationRegistry = Arc<ReservationRegistry>;

#[cfg(test)]
mod tests {
    use super::*;

    fn res(id: &str, project: &str, requester: &str, exclusive: bool, ttl_secs: i64) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: id.to_string(),
            project_id: project.to_string(),
            requester_id: requester.to_string(),
            patterns: vec!["src/**".to_string()],
            exclusive,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(ttl_secs),
        }
    }

    #[tokio::test]
    async fn register_and_get_active() {
        let reg = ReservationRegistry::new();
        reg.register(res("r1", "p1", "a", true, 60)).await;
        let active = reg.get_active("p1").await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "r1");
    }

    #[tokio::test]
    async fn expired_reservations_are_dropped_and_key_cleared() {
        let reg = ReservationRegistry::new();
        reg.register(res("r1", "p1", "a", true, -1)).await;
        let active = reg.get_active("p1").await;
        assert!(active.is_empty());

        let stats = reg.stats().await;
        assert_eq!(stats.project_count, 0, "empty project entries must be dropped");
    }

    #[tokio::test]
    async fn remove_drops_empty_project_key() {
        let reg = ReservationRegistry::new();
        reg.register(res("r1", "p1", "a", true, 60)).await;
        assert!(reg.remove("p1", "r1").await);
        assert!(!reg.remove("p1", "r1").await, "second remove is a no-op");
        let stats = reg.stats().await;
        assert_eq!(stats.project_count, 0);
    }

    #[tokio::test]
    async fn stats_counts_active_and_total() {
        let reg = ReservationRegistry::new();
        reg.register(res("r1", "p1", "a", true, 60)).await;
        reg.register(res("r2", "p1", "b", false, -1)).await;
        let stats = reg.stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 1);
    }
}
