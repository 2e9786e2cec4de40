use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    entities::users::UserEntitlementEntity,
    value_objects::{
        access::{AccessDecision, AccessRequest},
        attempts::{AttemptLog, AttemptRefund},
        entitlement_mutations::EntitlementMutation,
        ledger::MutationOutcome,
    },
};

/// Durable per-user entitlement records. Every method is one atomic row operation on a
/// row locked `FOR UPDATE`; a missing row is created with defaults first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntitlementRepository {
    async fn find_or_create(&self, user_id: i64, now: DateTime<Utc>) -> Result<UserEntitlementEntity>;

    /// Debits the row and, when allowed, logs the attempt in the same transaction.
    async fn evaluate_access(
        &self,
        user_id: i64,
        request: AccessRequest,
        log: AttemptLog,
    ) -> Result<AccessDecision>;

    /// Refunds one logged attempt of `user_id` at most once.
    async fn refund_attempt(
        &self,
        user_id: i64,
        attempt_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AttemptRefund>;

    async fn mutate(
        &self,
        user_id: i64,
        mutation: EntitlementMutation,
        now: DateTime<Utc>,
    ) -> Result<MutationOutcome>;

    /// Zero-based page ordered by id, plus the total row count.
    async fn list_page(&self, page: i64, page_size: i64) -> Result<(Vec<UserEntitlementEntity>, i64)>;
}
