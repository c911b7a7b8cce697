//! Account profile and pool metadata (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    Unlinked,
    Verified,
    Cooldown,
    Error,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: String,
    pub workspace_id: String,
    pub provider: String,
    pub status: ProfileStatus,
    /// 0-100.
    pub health_score: u8,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
}

impl AccountProfile {
    /// Available iff verified, not in an active cooldown, and not expired.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.status == ProfileStatus::Verified
            && self.cooldown_until.is_none_or(|t| now >= t)
            && self.expires_at.is_none_or(|t| t > now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    RoundRobin,
    LeastRecent,
    Random,
    Smart,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPoolMeta {
    pub id: String,
    pub workspace_id: String,
    pub provider: String,
    pub rotation_strategy: RotationStrategy,
    pub cooldown_minutes_default: i64,
    pub max_retries: u32,
    pub active_profile_id: Option<String>,
    pub last_rotated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(status: ProfileStatus) -> AccountProfile {
        AccountProfile {
            id: "p1".into(),
            workspace_id: "w1".into(),
            provider: "claude".into(),
            status,
            health_score: 90,
            last_used_at: None,
            last_verified_at: None,
            cooldown_until: None,
            expires_at: None,
            labels: vec![],
        }
    }

    #[test]
    fn verified_with_no_bounds_is_available() {
        assert!(profile(ProfileStatus::Verified).is_available(Utc::now()));
    }

    #[test]
    fn unverified_is_never_available() {
        assert!(!profile(ProfileStatus::Cooldown).is_available(Utc::now()));
    }

    #[test]
    fn active_cooldown_blocks_availability() {
        let mut p = profile(ProfileStatus::Verified);
        p.cooldown_until = Some(Utc::now() + chrono::Duration::minutes(5));
        assert!(!p.is_available(Utc::now()));
    }

    #[test]
    fn expired_cooldown_allows_availability() {
        let mut p = profile(ProfileStatus::Verified);
        p.cooldown_until = Some(Utc::now() - chrono::Duration::minutes(5));
        assert!(p.is_available(Utc::now()));
    }

    #[test]
    fn expired_profile_is_unavailable() {
        let mut p = profile(ProfileStatus::Verified);
        p.expires_at = Some(Utc::now() - chrono::Duration::minutes(1));
        assert!(!p.is_available(Utc::now()));
    }
}
