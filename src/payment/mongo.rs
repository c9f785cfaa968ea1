use async_trait::async_trait;
use mockall_double::double;
use mongodb::bson::{doc, Bson};
use std::sync::Arc;

#[double]
use crate::database::AppDatabase;
use crate::{
    constants::*,
    models::{Payment, PaymentState},
};

use super::PaymentRepository;

pub struct MongoPaymentRepository {
    db: Arc<AppDatabase>,
}

impl MongoPaymentRepository {
    pub fn new(db: Arc<AppDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PaymentRepository for MongoPaymentRepository {
    async fn find(&self, payment_id: &str) -> anyhow::Result<Option<Payment>> {
        let filter = Some(doc! {"id": payment_id});
        let payment = self
            .db
            .find_one::<Payment>(DB_NAME, COLL_PAYMENTS, filter, None)
            .await?;
        Ok(payment)
    }

    async fn transition(
        &self,
        payment_id: &str,
        from: &[PaymentState],
        to: PaymentState,
        now: i64,
    ) -> anyhow::Result<bool> {
        let from = from
            .iter()
            .map(|state| state.to_bson())
            .collect::<anyhow::Result<Vec<Bson>>>()?;
        let filter = doc! {"id": payment_id, "state": {"$in": from}};
        let mut fields = doc! {"state": to.to_bson()?, "updatedAt": now};
        fields.insert(to.timestamp_field(), now);
        let update = doc! {"$set": fields};
        let result = self
            .db
            .update_one(DB_NAME, COLL_PAYMENTS, filter, update, None)
            .await?;
        Ok(result.matched > 0)
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::{always, eq};

    use super::*;
    use crate::database::UpdateCount;

    #[tokio::test]
    async fn test_transition_is_conditional_on_current_state() {
        let filter = doc! {"id": "P1", "state": {"$in": ["INITIATED", "OTP_SENT"]}};
        let update = doc! {
            "$set": {"state": "OTP_SENT", "updatedAt": 9_000_i64, "otpSentAt": 9_000_i64}
        };
        let mut mock_db = AppDatabase::default();
        mock_db
            .expect_update_one()
            .with(eq(DB_NAME), eq(COLL_PAYMENTS), eq(filter), eq(update), always())
            .times(1)
            .returning(|_, _, _, _, _| {
                Ok(UpdateCount {
                    matched: 1,
                    modified: 1,
                })
            });
        let repo = MongoPaymentRepository::new(Arc::new(mock_db));
        let from = [PaymentState::INITIATED, PaymentState::OTP_SENT];
        let moved = repo
            .transition("P1", &from, PaymentState::OTP_SENT, 9_000)
            .await
            .unwrap();
        assert_eq!(moved, true);
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let mut mock_db = AppDatabase::default();
        mock_db
            .expect_find_one::<Payment>()
            .with(
                eq(DB_NAME),
                eq(COLL_PAYMENTS),
                eq(Some(doc! {"id": "P1"})),
                always(),
            )
            .times(1)
            .returning(|_, _, _, _| Ok(None));
        let repo = MongoPaymentRepository::new(Arc::new(mock_db));
        assert!(repo.find("P1").await.unwrap().is_none());
    }
}
