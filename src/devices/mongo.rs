use async_trait::async_trait;
use mockall_double::double;
use mongodb::{
    bson::{doc, to_document},
    options::UpdateOptions,
};
use std::sync::Arc;

#[double]
use crate::database::AppDatabase;
use crate::{
    constants::*,
    models::{DeviceRecord, UserDevices},
};

use super::DeviceRepository;

/// One `userDevices` document per user, devices kept in an embedded array
pub struct MongoDeviceRepository {
    db: Arc<AppDatabase>,
}

impl MongoDeviceRepository {
    pub fn new(db: Arc<AppDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DeviceRepository for MongoDeviceRepository {
    async fn find(&self, user_id: &str) -> anyhow::Result<Vec<DeviceRecord>> {
        let filter = Some(doc! {"userId": user_id});
        let user = self
            .db
            .find_one::<UserDevices>(DB_NAME, COLL_USER_DEVICES, filter, None)
            .await?;
        Ok(user.map(|user| user.devices).unwrap_or_default())
    }

    async fn refresh(
        &self,
        user_id: &str,
        token: &str,
        user_agent: &str,
        now: i64,
    ) -> anyhow::Result<bool> {
        let filter = doc! {"userId": user_id, "devices.token": token};
        let update = doc! {
            "$set": {
                "devices.$.lastActive": now,
                "devices.$.userAgent": user_agent,
                "devices.$.isActive": true,
                "updatedAt": now,
            }
        };
        let result = self
            .db
            .update_one(DB_NAME, COLL_USER_DEVICES, filter, update, None)
            .await?;
        Ok(result.matched > 0)
    }

    async fn append(&self, user_id: &str, device: &DeviceRecord, now: i64) -> anyhow::Result<()> {
        // make sure the user document exists, then push only if the token is absent
        let filter = doc! {"userId": user_id};
        let update = doc! {"$setOnInsert": {"devices": [], "updatedAt": now}};
        let options = UpdateOptions::builder().upsert(Some(true)).build();
        self.db
            .update_one(DB_NAME, COLL_USER_DEVICES, filter, update, Some(options))
            .await?;

        let filter = doc! {"userId": user_id, "devices.token": {"$ne": device.token.as_str()}};
        let update = doc! {
            "$push": {"devices": to_document(device)?},
            "$set": {"updatedAt": now},
        };
        self.db
            .update_one(DB_NAME, COLL_USER_DEVICES, filter, update, None)
            .await?;
        Ok(())
    }

    async fn remove(&self, user_id: &str, token: &str, now: i64) -> anyhow::Result<bool> {
        let filter = doc! {"userId": user_id, "devices.token": token};
        let update = doc! {
            "$pull": {"devices": {"token": token}},
            "$set": {"updatedAt": now},
        };
        let result = self
            .db
            .update_one(DB_NAME, COLL_USER_DEVICES, filter, update, None)
            .await?;
        Ok(result.modified > 0)
    }

    async fn touch(&self, user_id: &str, token: &str, now: i64) -> anyhow::Result<bool> {
        let filter = doc! {"userId": user_id, "devices.token": token};
        let update = doc! {"$set": {"devices.$.lastActive": now}};
        let result = self
            .db
            .update_one(DB_NAME, COLL_USER_DEVICES, filter, update, None)
            .await?;
        Ok(result.matched > 0)
    }
}
