use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::PaymentRepository;
use crate::models::{Payment, PaymentState};

#[derive(Debug, Default)]
pub struct MemoryPaymentRepository {
    payments: RwLock<HashMap<String, Payment>>,
}

impl MemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, payment: Payment) {
        let mut payments = self.payments.write().await;
        payments.insert(payment.id.clone(), payment);
    }
}

#[async_trait]
impl PaymentRepository for MemoryPaymentRepository {
    async fn find(&self, payment_id: &str) -> anyhow::Result<Option<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments.get(payment_id).cloned())
    }

    async fn transition(
        &self,
        payment_id: &str,
        from: &[PaymentState],
        to: PaymentState,
        now: i64,
    ) -> anyhow::Result<bool> {
        let mut payments = self.payments.write().await;
        match payments.get_mut(payment_id) {
            Some(payment) if from.contains(&payment.state) => {
                payment.state = to;
                payment.updated_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
