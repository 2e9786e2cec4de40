use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{
    entitlement_errors::{EntitlementError, UseCaseResult},
    payment_ledger::PaymentLedgerUseCase,
};
use crate::domain::{
    repositories::{
        access_attempts::AccessAttemptRepository, denylist::DenylistRepository,
        users::EntitlementRepository,
    },
    value_objects::{
        attempts::{AccessAttemptDto, AttemptHistoryPageDto},
        entitlement_mutations::{EntitlementMutation, MAX_MANUAL_CREDITS, MIN_MANUAL_CREDITS},
        entitlements::{AdminUserDto, AdminUserPageDto},
        enums::payment_sources::PaymentSource,
        ledger::LedgerOutcome,
        payment_payloads::PaymentPayload,
        plans::Plan,
        query_values::split_raw_values,
    },
};

pub const ADMIN_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrialAction {
    Expire,
    Restore,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DenylistChangeDto {
    pub requested: usize,
    pub changed: usize,
}

/// Operator console actions. Operators are not subject to the boot handshake.
pub struct AdminUseCase {
    entitlement_repo: Arc<dyn EntitlementRepository + Send + Sync>,
    denylist_repo: Arc<dyn DenylistRepository + Send + Sync>,
    attempt_repo: Arc<dyn AccessAttemptRepository + Send + Sync>,
    ledger: Arc<PaymentLedgerUseCase>,
    trial_limit: i32,
}

impl AdminUseCase {
    pub fn new(
        entitlement_repo: Arc<dyn EntitlementRepository + Send + Sync>,
        denylist_repo: Arc<dyn DenylistRepository + Send + Sync>,
        attempt_repo: Arc<dyn AccessAttemptRepository + Send + Sync>,
        ledger: Arc<PaymentLedgerUseCase>,
        trial_limit: i32,
    ) -> Self {
        Self {
            entitlement_repo,
            denylist_repo,
            attempt_repo,
            ledger,
            trial_limit,
        }
    }

    pub async fn list_users(&self, page: i64) -> UseCaseResult<AdminUserPageDto> {
        check_page(page)?;

        let (users, total) = self
            .entitlement_repo
            .list_page(page, ADMIN_PAGE_SIZE)
            .await
            .map_err(|err| {
                error!(page, db_error = ?err, "admin: failed to list users");
                EntitlementError::Internal(err)
            })?;

        Ok(AdminUserPageDto {
            page,
            page_size: ADMIN_PAGE_SIZE,
            total,
            users: users.into_iter().map(AdminUserDto::from).collect(),
        })
    }

    /// Logged attempts, newest first.
    pub async fn history(&self, page: i64) -> UseCaseResult<AttemptHistoryPageDto> {
        check_page(page)?;

        let (attempts, total) = self
            .attempt_repo
            .list_page(page, ADMIN_PAGE_SIZE)
            .await
            .map_err(|err| {
                error!(page, db_error = ?err, "admin: failed to list attempts");
                EntitlementError::Internal(err)
            })?;

        Ok(AttemptHistoryPageDto {
            page,
            page_size: ADMIN_PAGE_SIZE,
            total,
            attempts: attempts.into_iter().map(AccessAttemptDto::from).collect(),
        })
    }

    pub async fn set_blocked(&self, user_id: i64, value: bool, now: DateTime<Utc>) -> UseCaseResult<AdminUserDto> {
        self.mutate(user_id, EntitlementMutation::SetBlocked(value), now).await
    }

    pub async fn set_hidden(&self, user_id: i64, value: bool, now: DateTime<Utc>) -> UseCaseResult<AdminUserDto> {
        self.mutate(user_id, EntitlementMutation::SetHidden(value), now).await
    }

    pub async fn grant_credits(&self, user_id: i64, amount: i32, now: DateTime<Utc>) -> UseCaseResult<AdminUserDto> {
        if !(MIN_MANUAL_CREDITS..=MAX_MANUAL_CREDITS).contains(&amount) {
            return Err(EntitlementError::InvalidCreditAmount(amount));
        }
        self.mutate(user_id, EntitlementMutation::GrantManualCredits(amount), now)
            .await
    }

    pub async fn reset_trial(&self, user_id: i64, action: TrialAction, now: DateTime<Utc>) -> UseCaseResult<AdminUserDto> {
        let mutation = match action {
            TrialAction::Expire => EntitlementMutation::ExpireTrial {
                trial_limit: self.trial_limit,
            },
            TrialAction::Restore => EntitlementMutation::RestoreTrial,
        };
        self.mutate(user_id, mutation, now).await
    }

    /// Grants a plan through the payment ledger under a fresh `grant_` payload.
    pub async fn grant_subscription(&self, user_id: i64, plan_name: &str, now: DateTime<Utc>) -> UseCaseResult<AdminUserDto> {
        let plan = plan_name
            .trim()
            .parse::<Plan>()
            .map_err(|_| EntitlementError::UnknownPlan(plan_name.to_string()))?;
        let payload = PaymentPayload::for_grant(user_id, plan);

        match self.ledger.credit(&payload, now, PaymentSource::Admin).await? {
            LedgerOutcome::Applied { user } => Ok(AdminUserDto::from(user)),
            // Fresh uuid per grant; a collision only means the credit already exists.
            LedgerOutcome::AlreadyApplied => {
                let user = self
                    .entitlement_repo
                    .find_or_create(user_id, now)
                    .await
                    .map_err(EntitlementError::Internal)?;
                Ok(AdminUserDto::from(user))
            }
        }
    }

    pub async fn add_denylist(&self, values: Vec<String>, raw: Option<&str>) -> UseCaseResult<DenylistChangeDto> {
        let values = collect_values(values, raw)?;
        let requested = values.len();
        let changed = self
            .denylist_repo
            .add_values(values)
            .await
            .map_err(|err| {
                error!(requested, db_error = ?err, "admin: failed to extend denylist");
                EntitlementError::Internal(err)
            })?;

        info!(requested, changed, "admin: denylist extended");
        Ok(DenylistChangeDto { requested, changed })
    }

    pub async fn remove_denylist(&self, values: Vec<String>, raw: Option<&str>) -> UseCaseResult<DenylistChangeDto> {
        let values = collect_values(values, raw)?;
        let requested = values.len();
        let changed = self
            .denylist_repo
            .remove_values(values)
            .await
            .map_err(|err| {
                error!(requested, db_error = ?err, "admin: failed to shrink denylist");
                EntitlementError::Internal(err)
            })?;

        info!(requested, changed, "admin: denylist reduced");
        Ok(DenylistChangeDto { requested, changed })
    }

    async fn mutate(
        &self,
        user_id: i64,
        mutation: EntitlementMutation,
        now: DateTime<Utc>,
    ) -> UseCaseResult<AdminUserDto> {
        let outcome = self
            .entitlement_repo
            .mutate(user_id, mutation, now)
            .await
            .map_err(|err| {
                error!(%user_id, mutation = mutation.name(), db_error = ?err, "admin: mutation failed");
                EntitlementError::Internal(err)
            })?;

        info!(%user_id, mutation = mutation.name(), changed = outcome.changed, "admin: mutation applied");
        Ok(AdminUserDto::from(outcome.user))
    }
}

fn collect_values(values: Vec<String>, raw: Option<&str>) -> UseCaseResult<Vec<String>> {
    let mut collected: Vec<String> = values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();
    if let Some(raw) = raw {
        collected.extend(split_raw_values(raw));
    }
    collected.sort();
    collected.dedup();

    if collected.is_empty() {
        return Err(EntitlementError::InvalidInput(
            "no denylist values given".to_string(),
        ));
    }
    Ok(collected)
}

fn check_page(page: i64) -> UseCaseResult<()> {
    if page < 0 {
        return Err(EntitlementError::InvalidInput(format!(
            "page must not be negative, got {}",
            page
        )));
    }
    Ok(())
}
