use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    models::{most_recent_active, DeviceRecord},
    utils::Clock,
};

pub mod memory;
pub mod mongo;

pub use memory::MemoryDeviceRepository;
pub use mongo::MongoDeviceRepository;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("device storage error")]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnregisterResult {
    pub success: bool,
    pub message: String,
}

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn find(&self, user_id: &str) -> anyhow::Result<Vec<DeviceRecord>>;

    /// Update an existing entry with the same token in place.
    /// Returns `false` when the user has no such token.
    async fn refresh(
        &self,
        user_id: &str,
        token: &str,
        user_agent: &str,
        now: i64,
    ) -> anyhow::Result<bool>;

    async fn append(&self, user_id: &str, device: &DeviceRecord, now: i64) -> anyhow::Result<()>;

    async fn remove(&self, user_id: &str, token: &str, now: i64) -> anyhow::Result<bool>;

    async fn touch(&self, user_id: &str, token: &str, now: i64) -> anyhow::Result<bool>;
}

pub struct DeviceRegistry {
    repo: Arc<dyn DeviceRepository>,
    clock: Arc<dyn Clock>,
}

impl DeviceRegistry {
    pub fn new(repo: Arc<dyn DeviceRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Add the token to the user's devices, or refresh it if already there.
    /// A token appears at most once per user.
    pub async fn register(
        &self,
        user_id: &str,
        token: &str,
        user_agent: &str,
    ) -> Result<(), RegistryError> {
        let now = self.clock.now_ms();
        if self.repo.refresh(user_id, token, user_agent, now).await? {
            tracing::debug!("refreshed device for user {user_id}");
            return Ok(());
        }
        let device = DeviceRecord {
            token: token.to_owned(),
            device_id: ObjectId::new().to_hex(),
            is_active: true,
            last_active: now,
            user_agent: user_agent.to_owned(),
        };
        self.repo.append(user_id, &device, now).await?;
        tracing::info!("registered device {} for user {user_id}", device.device_id);
        Ok(())
    }

    /// Remove the token. Succeeds whether or not it was registered.
    pub async fn unregister(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<UnregisterResult, RegistryError> {
        let now = self.clock.now_ms();
        let removed = self.repo.remove(user_id, token, now).await?;
        let message = if removed {
            tracing::info!("unregistered device for user {user_id}");
            "Device unregistered"
        } else {
            "Device was not registered"
        };
        Ok(UnregisterResult {
            success: true,
            message: message.to_owned(),
        })
    }

    pub async fn most_recent_active(
        &self,
        user_id: &str,
    ) -> Result<Option<DeviceRecord>, RegistryError> {
        let devices = self.repo.find(user_id).await?;
        Ok(most_recent_active(&devices).cloned())
    }

    /// Heartbeat for a registered token, nothing happens for unknown ones
    pub async fn touch(&self, user_id: &str, token: &str) -> Result<bool, RegistryError> {
        let now = self.clock.now_ms();
        let touched = self.repo.touch(user_id, token, now).await?;
        Ok(touched)
    }

    pub async fn devices(&self, user_id: &str) -> Result<Vec<DeviceRecord>, RegistryError> {
        let devices = self.repo.find(user_id).await?;
        Ok(devices)
    }
}
