//! Rotation strategies as a tagged union with a `select_next` function per
//! variant (§9: "implement as a tagged union ... rather than an interface
//! hierarchy").

use chrono::Utc;
use rand::seq::SliceRandom;

use super::profile::{AccountProfile, RotationStrategy};

/// Pick the next profile to activate among `available`, given the
/// currently active profile id (if any). `available` is assumed to be
/// insertion-ordered (registration order).
pub fn select_next<'a>(
    strategy: RotationStrategy,
    available: &'a [AccountProfile],
    current_id: Option<&str>,
) -> Option<&'a AccountProfile> {
    match strategy {
        RotationStrategy::RoundRobin => round_robin(available, current_id),
        RotationStrategy::LeastRecent => least_recent(available),
        RotationStrategy::Random => random(available),
        RotationStrategy::Smart => smart(available, current_id),
    }
}

fn round_robin<'a>(
    available: &'a [AccountProfile],
    current_id: Option<&str>,
) -> Option<&'a AccountProfile> {
    if available.is_empty() {
        return None;
    }
    let current_idx = current_id.and_then(|id| available.iter().position(|p| p.id == id));
    match current_idx {
        Some(idx) => Some(&available[(idx + 1) % available.len()]),
        None => available.first(),
    }
}

fn least_recent(available: &[AccountProfile]) -> Option<&AccountProfile> {
    // `None < Some(_)` per spec: a profile never used sorts first.
    available.iter().min_by_key(|p| p.last_used_at)
}

fn random(available: &[AccountProfile]) -> Option<&AccountProfile> {
    available.choose(&mut rand::thread_rng())
}

fn smart<'a>(
    available: &'a [AccountProfile],
    current_id: Option<&str>,
) -> Option<&'a AccountProfile> {
    if available.is_empty() {
        return None;
    }
    let now = Utc::now();
    let mut best: Option<(f64, usize, &AccountProfile)> = None;

    for (idx, profile) in available.iter().enumerate() {
        let hours_since_use = profile
            .last_used_at
            .map(|t| (now - t).num_minutes() as f64 / 60.0)
            .unwrap_or(24.0)
            .max(0.0);
        let days_since_verified = profile
            .last_verified_at
            .map(|t| (now - t).num_hours() as f64 / 24.0)
            .unwrap_or(30.0)
            .max(0.0);

        let mut score = 0.4 * profile.health_score as f64
            + 1.25 * hours_since_use.min(24.0)
            + (30.0 - days_since_verified).max(0.0);

        if Some(profile.id.as_str()) == current_id {
            score -= 10.0;
        }

        let is_better = match &best {
            None => true,
            // Ties broken by insertion order: keep the earlier one unless
            // strictly beaten.
            Some((best_score, _, _)) => score > *best_score,
        };
        if is_better {
            best = Some((score, idx, profile));
        }
    }

    best.map(|(_, _, p)| p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn profile(id: &str, last_used_mins_ago: Option<i64>) -> AccountProfile {
        AccountProfile {
            id: id.to_string(),
            workspace_id: "w".into(),
            provider: "claude".into(),
            status: crate::account::profile::ProfileStatus::Verified,
            health_score: 100,
            last_used_at: last_used_mins_ago.map(|m| Utc::now() - Duration::minutes(m)),
            last_verified_at: Some(Utc::now()),
            cooldown_until: None,
            expires_at: None,
            labels: vec![],
        }
    }

    #[test]
    fn round_robin_wraps() {
        let profiles = vec![profile("p1", None), profile("p2", None), profile("p3", None)];
        let next = select_next(RotationStrategy::RoundRobin, &profiles, Some("p3"));
        assert_eq!(next.unwrap().id, "p1");
        let next = select_next(RotationStrategy::RoundRobin, &profiles, Some("p1"));
        assert_eq!(next.unwrap().id, "p2");
    }

    #[test]
    fn round_robin_with_no_current_picks_first() {
        let profiles = vec![profile("p1", None), profile("p2", None)];
        let next = select_next(RotationStrategy::RoundRobin, &profiles, None);
        assert_eq!(next.unwrap().id, "p1");
    }

    #[test]
    fn least_recent_prefers_never_used_then_oldest() {
        let profiles = vec![profile("p1", Some(5)), profile("p2", None), profile("p3", Some(60))];
        let next = select_next(RotationStrategy::LeastRecent, &profiles, None);
        assert_eq!(next.unwrap().id, "p2", "never-used sorts before any date");
    }

    #[test]
    fn least_recent_among_used_picks_oldest() {
        let profiles = vec![profile("p1", Some(5)), profile("p2", Some(60))];
        let next = select_next(RotationStrategy::LeastRecent, &profiles, None);
        assert_eq!(next.unwrap().id, "p2");
    }

    #[test]
    fn smart_penalizes_current_profile() {
        let profiles = vec![profile("p1", Some(1)), profile("p2", Some(1))];
        let next = select_next(RotationStrategy::Smart, &profiles, Some("p1"));
        assert_eq!(next.unwrap().id, "p2");
    }

    #[test]
    fn empty_pool_returns_none() {
        let profiles: Vec<AccountProfile> = vec![];
        for strategy in [
            RotationStrategy::RoundRobin,
            RotationStrategy::LeastRecent,
            RotationStrategy::Random,
            RotationStrategy::Smart,
        ] {
            assert!(select_next(strategy, &profiles, None).is_none());
        }
    }
}
