//! Provider-account pool: selection under cooldown/health constraints and
//! rate-limit-driven rotation (§4.8).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::AccountPoolConfig;
use crate::error::{CoreError, CoreResult};

use super::profile::{AccountPoolMeta, AccountProfile, ProfileStatus};
use super::rotation::select_next;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationResult {
    pub success: bool,
    pub new_profile_id: Option<String>,
    pub previous_profile_id: Option<String>,
    pub reason: String,
    pub retries_remaining: u32,
}

#[derive(Debug, Hash, Eq, PartialEq, Clone)]
struct PoolKey {
    workspace_id: String,
    provider: String,
}

/// In-memory account pool registry. One `AccountPool` instance is process-
/// global; every pool/profile is uniquely keyed by `(workspace_id, provider)`.
pub struct AccountPool {
    pools: RwLock<HashMap<PoolKey, AccountPoolMeta>>,
    profiles: RwLock<HashMap<PoolKey, Vec<AccountProfile>>>,
    config: AccountPoolConfig,
}

impl AccountPool {
    pub fn new(config: AccountPoolConfig) -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
            profiles: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub async fn ensure_pool(&self, meta: AccountPoolMeta) {
        let key = PoolKey {
            workspace_id: meta.workspace_id.clone(),
            provider: meta.provider.clone(),
        };
        self.pools.write().await.entry(key).or_insert(meta);
    }

    pub async fn add_profile(&self, profile: AccountProfile) {
        let key = PoolKey {
            workspace_id: profile.workspace_id.clone(),
            provider: profile.provider.clone(),
        };
        self.profiles.write().await.entry(key).or_default().push(profile);
    }

    pub async fn get_profile(&self, workspace_id: &str, provider: &str, id: &str) -> Option<AccountProfile> {
        let key = PoolKey {
            workspace_id: workspace_id.to_string(),
            provider: provider.to_string(),
        };
        self.profiles
            .read()
            .await
            .get(&key)?
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    /// Rotate the active profile for `(workspace_id, provider)`.
    pub async fn rotate(
        &self,
        workspace_id: &str,
        provider: &str,
        reason: &str,
    ) -> CoreResult<RotationResult> {
        let key = PoolKey {
            workspace_id: workspace_id.to_string(),
            provider: provider.to_string(),
        };

        let mut pools = self.pools.write().await;
        let meta = pools.get_mut(&key).ok_or_else(|| CoreError::NoPoolForProvider {
            workspace_id: workspace_id.to_string(),
            provider: provider.to_string(),
        })?;

        let mut profiles = self.profiles.write().await;
        let profile_list = profiles.get_mut(&key).ok_or_else(|| CoreError::NoAvailableProfile {
            workspace_id: workspace_id.to_string(),
            provider: provider.to_string(),
        })?;

        if profile_list.is_empty() {
            return Err(CoreError::NoAvailableProfile {
                workspace_id: workspace_id.to_string(),
                provider: provider.to_string(),
            });
        }

        let now = Utc::now();
        let available: Vec<AccountProfile> = profile_list
            .iter()
            .filter(|p| p.is_available(now))
            .cloned()
            .collect();

        let Some(chosen) = select_next(meta.rotation_strategy, &available, meta.active_profile_id.as_deref())
        else {
            return Err(CoreError::NoAvailableProfile {
                workspace_id: workspace_id.to_string(),
                provider: provider.to_string(),
            });
        };

        let previous = meta.active_profile_id.clone();
        let chosen_id = chosen.id.clone();

        meta.active_profile_id = Some(chosen_id.clone());
        meta.last_rotated_at = Some(now);

        if let Some(p) = profile_list.iter_mut().find(|p| p.id == chosen_id) {
            p.last_used_at = Some(now);
        }

        let retries_remaining = available.len().saturating_sub(1) as u32;

        debug!(workspace_id, provider, new_profile = %chosen_id, reason, "account pool rotated");

        Ok(RotationResult {
            success: true,
            new_profile_id: Some(chosen_id),
            previous_profile_id: previous,
            reason: reason.to_string(),
            retries_remaining,
        })
    }

    /// Put the current active profile into cooldown, then rotate.
    pub async fn handle_rate_limit(
        &self,
        workspace_id: &str,
        provider: &str,
        msg: &str,
    ) -> CoreResult<RotationResult> {
        let key = PoolKey {
            workspace_id: workspace_id.to_string(),
            provider: provider.to_string(),
        };

        let (active_id, cooldown_minutes) = {
            let pools = self.pools.read().await;
            let meta = pools.get(&key).ok_or_else(|| CoreError::NoPoolForProvider {
                workspace_id: workspace_id.to_string(),
                provider: provider.to_string(),
            })?;
            let active_id = meta
                .active_profile_id
                .clone()
                .ok_or_else(|| CoreError::NoAvailableProfile {
                    workspace_id: workspace_id.to_string(),
                    provider: provider.to_string(),
                })?;
            (active_id, meta.cooldown_minutes_default)
        };

        let cooldown_until = Utc::now() + chrono::Duration::minutes(cooldown_minutes);
        {
            let mut profiles = self.profiles.write().await;
            if let Some(list) = profiles.get_mut(&key) {
                if let Some(p) = list.iter_mut().find(|p| p.id == active_id) {
                    p.status = ProfileStatus::Cooldown;
                    p.cooldown_until = Some(cooldown_until);
                    warn!(workspace_id, provider, profile_id = %active_id, msg, "account put into cooldown after rate limit");
                }
            }
        }

        let reason = format!("Rate limit: {msg}");
        self.rotate(workspace_id, provider, &reason).await
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }
}

/// Case-insensitive substring match against provider-specific rate-limit
/// signatures.
pub fn is_rate_limit_error(provider: &str, msg: &str) -> bool {
    static SIGNATURES: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert(
            "claude",
            &["rate_limit_error", "429", "too many requests", "overloaded_error"],
        );
        m.insert("codex", &["rate limit", "429", "too many requests"]);
        m.insert("gemini", &["resource_exhausted", "429", "quota exceeded"]);
        m
    });

    let haystack = msg.to_ascii_lowercase();
    let generic: &[&str] = &["429", "too many requests", "rate limit"];
    SIGNATURES
        .get(provider)
        .unwrap_or(&generic)
        .iter()
        .any(|sig| haystack.contains(&sig.to_ascii_lowercase()))
}

pub type SharedAccountPool = Arc<AccountPool>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::profile::RotationStrategy;

    fn meta(strategy: RotationStrategy) -> AccountPoolMeta {
        AccountPoolMeta {
            id: "pool1".into(),
            workspace_id: "w1".into(),
            provider: "claude".into(),
            rotation_strategy: strategy,
            cooldown_minutes_default: 30,
            max_retries: 3,
            active_profile_id: None,
            last_rotated_at: None,
        }
    }

    fn verified_profile(id: &str) -> AccountProfile {
        AccountProfile {
            id: id.into(),
            workspace_id: "w1".into(),
            provider: "claude".into(),
            status: ProfileStatus::Verified,
            health_score: 100,
            last_used_at: None,
            last_verified_at: Some(Utc::now()),
            cooldown_until: None,
            expires_at: None,
            labels: vec![],
        }
    }

    #[tokio::test]
    async fn rotate_without_pool_fails() {
        let pool = AccountPool::new(AccountPoolConfig::default());
        let err = pool.rotate("w1", "claude", "test").await.unwrap_err();
        assert_eq!(err.code(), "no_pool_for_provider");
    }

    #[tokio::test]
    async fn rotate_with_empty_profiles_fails() {
        let pool = AccountPool::new(AccountPoolConfig::default());
        pool.ensure_pool(meta(RotationStrategy::RoundRobin)).await;
        let err = pool.rotate("w1", "claude", "test").await.unwrap_err();
        assert_eq!(err.code(), "no_available_profile");
    }

    #[tokio::test]
    async fn scenario_rotation_on_rate_limit() {
        let pool = AccountPool::new(AccountPoolConfig::default());
        pool.ensure_pool(meta(RotationStrategy::RoundRobin)).await;
        pool.add_profile(verified_profile("P1")).await;
        pool.add_profile(verified_profile("P2")).await;

        // P1 starts active.
        let first = pool.rotate("w1", "claude", "initial").await.unwrap();
        assert_eq!(first.new_profile_id.as_deref(), Some("P1"));

        let result = pool
            .handle_rate_limit("w1", "claude", "429 Too Many Requests")
            .await
            .unwrap();

        assert_eq!(result.new_profile_id.as_deref(), Some("P2"));
        assert_eq!(result.retries_remaining, 0);

        let p1 = pool.get_profile("w1", "claude", "P1").await.unwrap();
        assert_eq!(p1.status, ProfileStatus::Cooldown);
        assert!(p1.cooldown_until.is_some());
    }

    #[tokio::test]
    async fn handle_rate_limit_without_active_profile_fails() {
        let pool = AccountPool::new(AccountPoolConfig::default());
        pool.ensure_pool(meta(RotationStrategy::RoundRobin)).await;
        pool.add_profile(verified_profile("P1")).await;
        let err = pool
            .handle_rate_limit("w1", "claude", "429")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "no_available_profile");
    }

    #[test]
    fn rate_limit_signature_matching_is_case_insensitive() {
        assert!(is_rate_limit_error("claude", "429 Too Many Requests"));
        assert!(is_rate_limit_error("claude", "RATE_LIMIT_ERROR: slow down"));
        assert!(!is_rate_limit_error("claude", "invalid api key"));
    }
}
