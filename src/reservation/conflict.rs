//! Conflict detection and resolution suggestions over active reservations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pattern::overlap;
use crate::reservation::{Reservation, ReservationRegistry};

const WAIT_THRESHOLD: chrono::Duration = chrono::Duration::minutes(5);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Wait {
        expires_at: DateTime<Utc>,
    },
    Narrow {
        suggested_patterns: Vec<String>,
    },
    Override,
    Share,
}

/// A detected overlap between a requested pattern set and one existing
/// reservation. References the existing reservation by value — it may
/// later expire without invalidating this already-emitted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationConflict {
    pub conflict_id: String,
    pub project_id: String,
    pub overlapping_pattern: String,
    pub existing_reservation: Reservation,
    pub requested_patterns: Vec<String>,
    pub resolutions: Vec<Resolution>,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResult {
    pub has_conflicts: bool,
    pub conflicts: Vec<ReservationConflict>,
    pub can_proceed: bool,
}

pub struct ConflictEngine {
    registry: Arc<ReservationRegistry>,
}

impl ConflictEngine {
    pub fn new(registry: Arc<ReservationRegistry>) -> Self {
        Self { registry }
    }

    pub async fn check_conflicts(
        &self,
        project_id: &str,
        requester_id: &str,
        patterns: &[String],
        exclusive: bool,
    ) -> ConflictCheckResult {
        let now = Utc::now();
        let active = self.registry.get_active(project_id).await;
        let mut conflicts = Vec::new();

        'per_reservation: for existing in &active {
            if existing.requester_id == requester_id {
                continue;
            }
            if !existing.exclusive && !exclusive {
                continue;
            }
            for requested in patterns {
                for existing_pattern in &existing.patterns {
                    if overlap(requested, existing_pattern) {
                        conflicts.push(self.create_conflict(
                            project_id,
                            existing,
                            existing_pattern,
                            patterns,
                            exclusive,
                            now,
                        ));
                        continue 'per_reservation;
                    }
                }
            }
        }

        let has_conflicts = !conflicts.is_empty();
        ConflictCheckResult {
            has_conflicts,
            can_proceed: !has_conflicts,
            conflicts,
        }
    }

    fn create_conflict(
        &self,
        project_id: &str,
        existing: &Reservation,
        overlapping_pattern: &str,
        requested_patterns: &[String],
        requested_exclusive: bool,
        now: DateTime<Utc>,
    ) -> ReservationConflict {
        let mut resolutions = Vec::new();

        let remaining = existing.expires_at - now;
        if remaining > chrono::Duration::zero() && remaining < WAIT_THRESHOLD {
            resolutions.push(Resolution::Wait {
                expires_at: existing.expires_at,
            });
        }

        if requested_patterns.iter().any(|p| p.contains("**")) {
            let narrowed: Vec<String> = requested_patterns
                .iter()
                .map(|p| p.replace("/**", "").replace("**", ""))
                .filter(|p| !p.is_empty())
                .collect();
            let still_overlaps = narrowed
                .iter()
                .any(|n| existing.patterns.iter().any(|ep| overlap(n, ep)));
            if !narrowed.is_empty() && !still_overlaps {
                resolutions.push(Resolution::Narrow {
                    suggested_patterns: narrowed,
                });
            }
        }

        if !existing.exclusive && requested_exclusive {
            resolutions.push(Resolution::Share);
        }

        ReservationConflict {
            conflict_id: ulid::Ulid::new().to_string(),
            project_id: project_id.to_string(),
            overlapping_pattern: overlapping_pattern.to_string(),
            existing_reservation: existing.clone(),
            requested_patterns: requested_patterns.to_vec(),
            resolutions,
            detected_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservation::ReservationRegistry;

    async fn setup_with_reservation(
        exclusive: bool,
        ttl_secs: i64,
    ) -> (ConflictEngine, Arc<ReservationRegistry>) {
        let registry = Arc::new(ReservationRegistry::new());
        let now = Utc::now();
        registry
            .register(Reservation {
                id: "r1".into(),
                project_id: "P".into(),
                requester_id: "A".into(),
                patterns: vec!["src/**".into()],
                exclusive,
                created_at: now,
                expires_at: now + chrono::Duration::seconds(ttl_secs),
            })
            .await;
        let engine = ConflictEngine::new(Arc::clone(&registry));
        (engine, registry)
    }

    #[tokio::test]
    async fn scenario_exclusive_conflict_reports_overlapping_pattern() {
        let (engine, _registry) = setup_with_reservation(true, 600).await;
        let result = engine
            .check_conflicts("P", "B", &["src/app.ts".to_string()], true)
            .await;

        assert!(result.has_conflicts);
        assert!(!result.can_proceed);
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].overlapping_pattern, "src/**");
    }

    #[tokio::test]
    async fn narrow_suggested_when_stripped_pattern_no_longer_overlaps() {
        let registry = Arc::new(ReservationRegistry::new());
        let now = Utc::now();
        registry
            .register(Reservation {
                id: "r1".into(),
                project_id: "P".into(),
                requester_id: "A".into(),
                patterns: vec!["src/config.ts".into()],
                exclusive: true,
                created_at: now,
                expires_at: now + chrono::Duration::seconds(600),
            })
            .await;
        let engine = ConflictEngine::new(Arc::clone(&registry));

        // The requester's own pattern contains `**`; stripping it down to
        // `src` no longer overlaps the existing `src/config.ts` reservation,
        // so a Narrow suggestion is offered.
        let result = engine
            .check_conflicts("P", "B", &["src/**".to_string()], true)
            .await;
        let resolutions = &result.conflicts[0].resolutions;
        assert!(resolutions
            .iter()
            .any(|r| matches!(r, Resolution::Narrow { .. })));
        assert!(!resolutions.iter().any(|r| matches!(r, Resolution::Wait { .. })),
            "TTL of 600s exceeds the 5-minute wait threshold");
    }

    #[tokio::test]
    async fn narrow_not_suggested_when_stripped_pattern_still_overlaps() {
        // Existing reservation is itself `src/**`: stripping the requester's
        // `src/**/*.ts` down to `src` still overlaps it, so no Narrow is
        // offered (per the §4.3 limit: only suggest a narrowing that
        // provably removes the overlap).
        let (engine, _registry) = setup_with_reservation(true, 600).await;
        let result = engine
            .check_conflicts("P", "B", &["src/**/*.ts".to_string()], true)
            .await;
        let resolutions = &result.conflicts[0].resolutions;
        assert!(!resolutions
            .iter()
            .any(|r| matches!(r, Resolution::Narrow { .. })));
    }

    #[tokio::test]
    async fn wait_suggested_when_ttl_under_five_minutes() {
        let (engine, _registry) = setup_with_reservation(true, 120).await;
        let result = engine
            .check_conflicts("P", "B", &["src/app.ts".to_string()], true)
            .await;
        assert!(result.conflicts[0]
            .resolutions
            .iter()
            .any(|r| matches!(r, Resolution::Wait { .. })));
    }

    #[tokio::test]
    async fn shared_reads_coexist() {
        let (engine, _registry) = setup_with_reservation(false, 600).await;
        let result = engine
            .check_conflicts("P", "B", &["src/app.ts".to_string()], false)
            .await;
        assert!(!result.has_conflicts);
    }

    #[tokio::test]
    async fn share_suggested_when_shared_existing_meets_exclusive_request() {
        let (engine, _registry) = setup_with_reservation(false, 600).await;
        let result = engine
            .check_conflicts("P", "B", &["src/app.ts".to_string()], true)
            .await;
        assert!(result.has_conflicts);
        assert!(result.conflicts[0]
            .resolutions
            .iter()
            .any(|r| matches!(r, Resolution::Share)));
    }

    #[tokio::test]
    async fn same_requester_never_conflicts_with_itself() {
        let (engine, _registry) = setup_with_reservation(true, 600).await;
        let result = engine
            .check_conflicts("P", "A", &["src/app.ts".to_string()], true)
            .await;
        assert!(!result.has_conflicts);
        for c in &result.conflicts {
            assert_ne!(c.existing_reservation.requester_id, "A");
        }
    }
}
