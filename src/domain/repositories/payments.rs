use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity},
    value_objects::{ledger::LedgerOutcome, plans::PlanEffect},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentLedgerRepository {
    /// Inserts the ledger row and, only when the payload is new, applies `effect` to the
    /// user and marks the matching invoice paid. All in one transaction.
    async fn apply_payment(&self, payment: InsertPaymentEntity, effect: PlanEffect) -> Result<LedgerOutcome>;

    async fn find_by_payload(&self, payload: String) -> Result<Option<PaymentEntity>>;
}
