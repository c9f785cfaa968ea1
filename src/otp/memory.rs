use async_trait::async_trait;
use tokio::sync::RwLock;

use super::OtpRepository;
use crate::models::OtpRecord;

/// Process local OTP records, one write lock per operation
#[derive(Debug, Default)]
pub struct MemoryOtpRepository {
    records: RwLock<Vec<OtpRecord>>,
}

impl MemoryOtpRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn active_index(
    records: &[OtpRecord],
    payment_id: &str,
    now: i64,
    ceiling: u32,
) -> Option<usize> {
    records
        .iter()
        .position(|rec| rec.payment_id == payment_id && rec.is_active(now, ceiling))
}

#[async_trait]
impl OtpRepository for MemoryOtpRepository {
    async fn insert_if_no_active(
        &self,
        record: &OtpRecord,
        now: i64,
        ceiling: u32,
    ) -> anyhow::Result<bool> {
        let mut records = self.records.write().await;
        if active_index(&records, &record.payment_id, now, ceiling).is_some() {
            return Ok(false);
        }
        records.push(record.clone());
        Ok(true)
    }

    async fn consume(
        &self,
        payment_id: &str,
        code: &str,
        now: i64,
        ceiling: u32,
    ) -> anyhow::Result<Option<OtpRecord>> {
        let mut records = self.records.write().await;
        let Some(idx) = active_index(&records, payment_id, now, ceiling) else {
            return Ok(None);
        };
        let record = &mut records[idx];
        if record.code != code {
            return Ok(None);
        }
        record.is_used = true;
        record.used_at = Some(now);
        Ok(Some(record.clone()))
    }

    async fn charge_attempt(
        &self,
        payment_id: &str,
        code: &str,
        now: i64,
        ceiling: u32,
    ) -> anyhow::Result<Option<OtpRecord>> {
        let mut records = self.records.write().await;
        let Some(idx) = active_index(&records, payment_id, now, ceiling) else {
            return Ok(None);
        };
        let record = &mut records[idx];
        if record.code == code {
            return Ok(None);
        }
        record.attempts += 1;
        Ok(Some(record.clone()))
    }

    async fn latest(&self, payment_id: &str) -> anyhow::Result<Option<OtpRecord>> {
        let records = self.records.read().await;
        // later inserts win ties on created_at
        let latest = records
            .iter()
            .filter(|rec| rec.payment_id == payment_id)
            .fold(None, |best: Option<&OtpRecord>, rec| match best {
                Some(best) if best.created_at > rec.created_at => Some(best),
                _ => Some(rec),
            });
        Ok(latest.cloned())
    }

    async fn active_for_retailer(
        &self,
        retailer_id: &str,
        now: i64,
        ceiling: u32,
    ) -> anyhow::Result<Vec<OtpRecord>> {
        let records = self.records.read().await;
        let mut active = records
            .iter()
            .filter(|rec| rec.retailer_id == retailer_id && rec.is_active(now, ceiling))
            .cloned()
            .collect::<Vec<_>>();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }

    async fn invalidate(&self, payment_id: &str, now: i64) -> anyhow::Result<u64> {
        let mut records = self.records.write().await;
        let mut count = 0;
        for rec in records
            .iter_mut()
            .filter(|rec| rec.payment_id == payment_id && !rec.is_used)
        {
            rec.expires_at = now - 1;
            rec.invalidated_at = Some(now);
            count += 1;
        }
        Ok(count)
    }
}
