//! Abstract persistence capability (§6). The coordination core treats
//! storage as a narrow key-value/relational surface — schema, migrations,
//! and the concrete backend live outside this crate.

use async_trait::async_trait;

use crate::account::AccountProfile;

#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    pub workspace_id: Option<String>,
    pub provider: Option<String>,
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn list_profiles(&self, filter: ProfileFilter, limit: usize) -> anyhow::Result<Vec<AccountProfile>>;
    async fn get_profile(&self, id: &str) -> anyhow::Result<Option<AccountProfile>>;
    async fn insert_profile(&self, profile: AccountProfile) -> anyhow::Result<()>;
    async fn update_profile(&self, profile: AccountProfile) -> anyhow::Result<()>;
    async fn delete_profile(&self, id: &str) -> anyhow::Result<()>;
}
