use async_trait::async_trait;
use mockall_double::double;
use mongodb::bson::doc;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;

#[double]
use crate::database::AppDatabase;
use crate::{
    cache::Cache,
    constants::*,
    models::{Profile, StoredProfile},
};

/// Read access to user profiles owned by another service
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn find_profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>>;
}

pub struct MongoDirectoryRepository {
    db: Arc<AppDatabase>,
}

impl MongoDirectoryRepository {
    pub fn new(db: Arc<AppDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DirectoryRepository for MongoDirectoryRepository {
    async fn find_profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>> {
        let filter = Some(doc! {"id": user_id});
        let stored = self
            .db
            .find_one::<StoredProfile>(DB_NAME, COLL_USERS, filter, None)
            .await?;
        Ok(stored.map(Profile::from))
    }
}

#[derive(Debug, Default)]
pub struct MemoryDirectoryRepository {
    profiles: RwLock<HashMap<String, Profile>>,
}

impl MemoryDirectoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: Profile) {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl DirectoryRepository for MemoryDirectoryRepository {
    async fn find_profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(user_id).cloned())
    }
}

/// Profile lookups with a read-through cache
pub struct Directory {
    repo: Arc<dyn DirectoryRepository>,
    cache: Arc<dyn Cache<Profile>>,
    ttl: Duration,
}

impl Directory {
    pub fn new(
        repo: Arc<dyn DirectoryRepository>,
        cache: Arc<dyn Cache<Profile>>,
        ttl: Duration,
    ) -> Self {
        Self { repo, cache, ttl }
    }

    pub async fn profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>> {
        if let Some(profile) = self.cache.get(user_id) {
            return Ok(Some(profile));
        }
        let profile = self.repo.find_profile(user_id).await?;
        if let Some(profile) = &profile {
            self.cache.set(user_id, profile.clone(), self.ttl);
        }
        Ok(profile)
    }

    /// Name used in message templates, the id itself when unknown
    pub async fn display_name(&self, user_id: &str) -> String {
        match self.profile(user_id).await {
            Ok(Some(profile)) if !profile.name.trim().is_empty() => profile.name,
            Ok(_) => user_id.to_owned(),
            Err(err) => {
                tracing::warn!("could not resolve profile of {user_id}: {err:?}");
                user_id.to_owned()
            }
        }
    }
}
