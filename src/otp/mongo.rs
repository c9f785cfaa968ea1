use async_trait::async_trait;
use mockall_double::double;
use mongodb::{
    bson::{doc, to_document, Document},
    options::{FindOneAndUpdateOptions, FindOneOptions, FindOptions, ReturnDocument},
};
use std::sync::Arc;

#[double]
use crate::database::AppDatabase;
use crate::{constants::*, models::OtpRecord};

use super::OtpRepository;

pub struct MongoOtpRepository {
    db: Arc<AppDatabase>,
}

impl MongoOtpRepository {
    pub fn new(db: Arc<AppDatabase>) -> Self {
        Self { db }
    }
}

// matches the one record of a payment that still accepts submissions
fn active_filter(payment_id: &str, now: i64, ceiling: u32) -> Document {
    doc! {
        "paymentId": payment_id,
        "isUsed": false,
        "expiresAt": {"$gte": now},
        "attempts": {"$lt": ceiling as i64},
    }
}

fn return_after() -> Option<FindOneAndUpdateOptions> {
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    Some(options)
}

#[async_trait]
impl OtpRepository for MongoOtpRepository {
    async fn insert_if_no_active(
        &self,
        record: &OtpRecord,
        now: i64,
        ceiling: u32,
    ) -> anyhow::Result<bool> {
        let filter = active_filter(&record.payment_id, now, ceiling);
        let mut fields = to_document(record)?;
        // supplied by the equality part of the filter on insert
        fields.remove("paymentId");
        fields.remove("isUsed");
        let update = doc! {"$setOnInsert": fields};
        let options = FindOneAndUpdateOptions::builder()
            .upsert(Some(true))
            .return_document(ReturnDocument::Before)
            .build();
        let existing = self
            .db
            .find_one_and_update::<Document>(DB_NAME, COLL_OTP, filter, update, Some(options))
            .await?;
        Ok(existing.is_none())
    }

    async fn consume(
        &self,
        payment_id: &str,
        code: &str,
        now: i64,
        ceiling: u32,
    ) -> anyhow::Result<Option<OtpRecord>> {
        let mut filter = active_filter(payment_id, now, ceiling);
        filter.insert("code", code);
        let update = doc! {"$set": {"isUsed": true, "usedAt": now}};
        let record = self
            .db
            .find_one_and_update::<OtpRecord>(DB_NAME, COLL_OTP, filter, update, return_after())
            .await?;
        Ok(record)
    }

    async fn charge_attempt(
        &self,
        payment_id: &str,
        code: &str,
        now: i64,
        ceiling: u32,
    ) -> anyhow::Result<Option<OtpRecord>> {
        let mut filter = active_filter(payment_id, now, ceiling);
        filter.insert("code", doc! {"$ne": code});
        let update = doc! {"$inc": {"attempts": 1}};
        let record = self
            .db
            .find_one_and_update::<OtpRecord>(DB_NAME, COLL_OTP, filter, update, return_after())
            .await?;
        Ok(record)
    }

    async fn latest(&self, payment_id: &str) -> anyhow::Result<Option<OtpRecord>> {
        let filter = Some(doc! {"paymentId": payment_id});
        let options = FindOneOptions::builder()
            .sort(Some(doc! {"createdAt": -1}))
            .build();
        let record = self
            .db
            .find_one::<OtpRecord>(DB_NAME, COLL_OTP, filter, Some(options))
            .await?;
        Ok(record)
    }

    async fn active_for_retailer(
        &self,
        retailer_id: &str,
        now: i64,
        ceiling: u32,
    ) -> anyhow::Result<Vec<OtpRecord>> {
        let filter = doc! {
            "retailerId": retailer_id,
            "isUsed": false,
            "expiresAt": {"$gte": now},
            "attempts": {"$lt": ceiling as i64},
        };
        let options = FindOptions::builder()
            .sort(Some(doc! {"createdAt": -1}))
            .limit(Some(DEFAULT_QUERY_LIMIT))
            .build();
        let records = self
            .db
            .find::<OtpRecord>(DB_NAME, COLL_OTP, Some(filter), Some(options))
            .await?;
        Ok(records)
    }

    async fn invalidate(&self, payment_id: &str, now: i64) -> anyhow::Result<u64> {
        let filter = doc! {"paymentId": payment_id, "isUsed": false};
        let update = doc! {"$set": {"expiresAt": now - 1, "invalidatedAt": now}};
        let result = self
            .db
            .update_many(DB_NAME, COLL_OTP, filter, update, None)
            .await?;
        Ok(result.modified)
    }
}
