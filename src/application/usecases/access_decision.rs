use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    boot_epoch_gate::BootEpochGateUseCase,
    entitlement_errors::{EntitlementError, UseCaseResult},
};
use crate::domain::{
    repositories::{
        access_attempts::AccessAttemptRepository, denylist::DenylistRepository,
        users::EntitlementRepository,
    },
    value_objects::{
        access::{AccessDecision, AccessRequest, DenyReason},
        attempts::{AttemptLog, AttemptOutcome, AttemptRefund},
        enums::quota_refund_policies::QuotaRefundPolicy,
        flood_guard::FloodPolicy,
        query_values,
    },
};

#[derive(Debug, Clone, Copy)]
pub struct AccessSettings {
    pub trial_limit: i32,
    pub flood_policy: FloodPolicy,
    pub refund_policy: QuotaRefundPolicy,
}

pub struct AccessDecisionUseCase {
    entitlement_repo: Arc<dyn EntitlementRepository + Send + Sync>,
    denylist_repo: Arc<dyn DenylistRepository + Send + Sync>,
    attempt_repo: Arc<dyn AccessAttemptRepository + Send + Sync>,
    gate: Arc<BootEpochGateUseCase>,
    settings: AccessSettings,
}

impl AccessDecisionUseCase {
    pub fn new(
        entitlement_repo: Arc<dyn EntitlementRepository + Send + Sync>,
        denylist_repo: Arc<dyn DenylistRepository + Send + Sync>,
        attempt_repo: Arc<dyn AccessAttemptRepository + Send + Sync>,
        gate: Arc<BootEpochGateUseCase>,
        settings: AccessSettings,
    ) -> Self {
        Self {
            entitlement_repo,
            denylist_repo,
            attempt_repo,
            gate,
            settings,
        }
    }

    pub fn refund_policy(&self) -> QuotaRefundPolicy {
        self.settings.refund_policy
    }

    /// Decides one metered action. Quota is debited here, before the downstream call, and
    /// an allowed attempt is logged in the same transaction.
    pub async fn decide(
        &self,
        user_id: i64,
        privileged: bool,
        query: &str,
        now: DateTime<Utc>,
    ) -> UseCaseResult<AccessDecision> {
        let candidates = query_values::lookup_candidates(query);
        let prohibited = if candidates.is_empty() {
            false
        } else {
            self.denylist_repo
                .contains_any(candidates)
                .await
                .map_err(|err| {
                    error!(%user_id, db_error = ?err, "access_decision: denylist lookup failed");
                    EntitlementError::Internal(err)
                })?
        };

        let request = AccessRequest {
            attempt_id: Uuid::new_v4(),
            now,
            boot_epoch: self.gate.epoch(),
            privileged,
            prohibited,
            trial_limit: self.settings.trial_limit,
            flood_policy: self.settings.flood_policy,
        };

        let decision = self
            .entitlement_repo
            .evaluate_access(user_id, request, AttemptLog::from_query(query))
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "access_decision: evaluation failed");
                EntitlementError::Internal(err)
            })?;

        match decision {
            AccessDecision::Allow {
                consumed_from,
                attempt_id,
            } => {
                info!(%user_id, %attempt_id, consumed_from = %consumed_from, "access_decision: allowed");
            }
            AccessDecision::Deny { reason } => {
                info!(%user_id, reason = %reason, "access_decision: denied");
                if reason == DenyReason::ReactivationRequired {
                    self.gate.request_reactivation(user_id).await;
                }
            }
        }

        Ok(decision)
    }

    /// Records how the downstream call of an allowed attempt went. Returns false when the
    /// attempt is unknown or its outcome was already recorded.
    pub async fn finish(
        &self,
        user_id: i64,
        attempt_id: Uuid,
        outcome: AttemptOutcome,
        now: DateTime<Utc>,
    ) -> UseCaseResult<bool> {
        if outcome.result_count < 0 {
            return Err(EntitlementError::InvalidInput(format!(
                "result_count must not be negative, got {}",
                outcome.result_count
            )));
        }

        let recorded = self
            .attempt_repo
            .finish(user_id, attempt_id, outcome, now)
            .await
            .map_err(|err| {
                error!(%user_id, %attempt_id, db_error = ?err, "access_decision: finish failed");
                EntitlementError::Internal(err)
            })?;

        if !recorded {
            warn!(%user_id, %attempt_id, "access_decision: attempt unknown or already finished");
        }
        Ok(recorded)
    }

    /// Hands back what one failed attempt debited. Each attempt is refunded at most once;
    /// returns whether anything was restored.
    pub async fn refund(
        &self,
        user_id: i64,
        attempt_id: Uuid,
        now: DateTime<Utc>,
    ) -> UseCaseResult<bool> {
        if self.settings.refund_policy != QuotaRefundPolicy::OnFailure {
            return Err(EntitlementError::RefundDisabled);
        }

        self.gate.ensure_active(user_id, now).await?;

        let refund = self
            .entitlement_repo
            .refund_attempt(user_id, attempt_id, now)
            .await
            .map_err(|err| {
                error!(%user_id, %attempt_id, db_error = ?err, "access_decision: refund failed");
                EntitlementError::Internal(err)
            })?;

        match refund {
            AttemptRefund::Refunded { restored } => {
                info!(%user_id, %attempt_id, restored, "access_decision: attempt refunded");
                Ok(restored)
            }
            AttemptRefund::AlreadyRefunded => {
                warn!(%user_id, %attempt_id, "access_decision: attempt already refunded");
                Ok(false)
            }
            AttemptRefund::Succeeded => {
                warn!(%user_id, %attempt_id, "access_decision: attempt succeeded, nothing to refund");
                Ok(false)
            }
            AttemptRefund::UnknownAttempt => Err(EntitlementError::UnknownAttempt(attempt_id)),
        }
    }
}
