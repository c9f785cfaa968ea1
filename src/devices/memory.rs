use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::DeviceRepository;
use crate::models::DeviceRecord;

#[derive(Debug, Default)]
pub struct MemoryDeviceRepository {
    users: RwLock<HashMap<String, Vec<DeviceRecord>>>,
}

impl MemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceRepository for MemoryDeviceRepository {
    async fn find(&self, user_id: &str) -> anyhow::Result<Vec<DeviceRecord>> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned().unwrap_or_default())
    }

    async fn refresh(
        &self,
        user_id: &str,
        token: &str,
        user_agent: &str,
        now: i64,
    ) -> anyhow::Result<bool> {
        let mut users = self.users.write().await;
        let device = users
            .get_mut(user_id)
            .and_then(|devices| devices.iter_mut().find(|dev| dev.token == token));
        let Some(device) = device else {
            return Ok(false);
        };
        device.last_active = now;
        device.user_agent = user_agent.to_owned();
        device.is_active = true;
        Ok(true)
    }

    async fn append(&self, user_id: &str, device: &DeviceRecord, _now: i64) -> anyhow::Result<()> {
        let mut users = self.users.write().await;
        let devices = users.entry(user_id.to_owned()).or_default();
        // a token registered in between keeps its entry and position
        if !devices.iter().any(|dev| dev.token == device.token) {
            devices.push(device.clone());
        }
        Ok(())
    }

    async fn remove(&self, user_id: &str, token: &str, _now: i64) -> anyhow::Result<bool> {
        let mut users = self.users.write().await;
        let Some(devices) = users.get_mut(user_id) else {
            return Ok(false);
        };
        let before = devices.len();
        devices.retain(|dev| dev.token != token);
        Ok(devices.len() != before)
    }

    async fn touch(&self, user_id: &str, token: &str, now: i64) -> anyhow::Result<bool> {
        let mut users = self.users.write().await;
        let device = users
            .get_mut(user_id)
            .and_then(|devices| devices.iter_mut().find(|dev| dev.token == token));
        match device {
            Some(device) => {
                device.last_active = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(token: &str, device_id: &str, last_active: i64) -> DeviceRecord {
        DeviceRecord {
            token: token.to_owned(),
            device_id: device_id.to_owned(),
            is_active: true,
            last_active,
            user_agent: String::new(),
        }
    }

    #[tokio::test]
    async fn test_append_keeps_existing_token_in_place() {
        let repo = MemoryDeviceRepository::new();
        repo.append("U1", &device("tok-A", "d1", 10), 10).await.unwrap();
        repo.append("U1", &device("tok-B", "d2", 10), 10).await.unwrap();
        repo.append("U1", &device("tok-A", "d3", 20), 20).await.unwrap();
        let devices = repo.find("U1").await.unwrap();
        let tokens: Vec<&str> = devices.iter().map(|dev| dev.token.as_str()).collect();
        assert_eq!(tokens, vec!["tok-A", "tok-B"]);
        assert_eq!(devices[0].device_id, "d1");
        assert_eq!(devices[0].last_active, 10);
    }

    #[tokio::test]
    async fn test_touch_and_remove_unknown_user() {
        let repo = MemoryDeviceRepository::new();
        assert_eq!(repo.touch("U9", "tok-A", 5).await.unwrap(), false);
        assert_eq!(repo.remove("U9", "tok-A", 5).await.unwrap(), false);
        assert!(repo.find("U9").await.unwrap().is_empty());
    }
}
