use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    entities::{
        access_attempts::AccessAttemptEntity,
        payments::{InsertPaymentEntity, PaymentEntity},
        users::UserEntitlementEntity,
    },
    repositories::{
        access_attempts::AccessAttemptRepository, batch::BatchMutationRepository,
        denylist::DenylistRepository, notifier::Notifier, payments::PaymentLedgerRepository,
        users::EntitlementRepository,
    },
    value_objects::{
        access::{self, AccessDecision, AccessRequest},
        attempts::{self, AttemptLog, AttemptOutcome, AttemptRefund},
        batch_jobs::BatchMutation,
        entitlement_mutations::EntitlementMutation,
        ledger::{LedgerOutcome, MutationOutcome},
        plans::PlanEffect,
    },
};

/// Store backed by a mutex-guarded map. Applies the same domain rules as the Postgres
/// repositories, one lock per operation.
#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<i64, UserEntitlementEntity>>,
    payments: Mutex<HashMap<String, PaymentEntity>>,
    denylist: Mutex<HashSet<String>>,
    attempts: Mutex<HashMap<Uuid, AccessAttemptEntity>>,
    pub fail_chunks: Mutex<bool>,
}

impl InMemoryStore {
    pub fn with_users(users: Vec<UserEntitlementEntity>) -> Self {
        let store = Self::default();
        {
            let mut map = store.users.lock().unwrap();
            for user in users {
                map.insert(user.id, user);
            }
        }
        store
    }

    pub fn user(&self, user_id: i64) -> Option<UserEntitlementEntity> {
        self.users.lock().unwrap().get(&user_id).cloned()
    }

    pub fn payment_count(&self) -> usize {
        self.payments.lock().unwrap().len()
    }

    pub fn attempt(&self, attempt_id: Uuid) -> Option<AccessAttemptEntity> {
        self.attempts.lock().unwrap().get(&attempt_id).cloned()
    }

    fn with_user<T>(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut UserEntitlementEntity) -> T,
    ) -> T {
        let mut users = self.users.lock().unwrap();
        let user = users
            .entry(user_id)
            .or_insert_with(|| UserEntitlementEntity::new_default(user_id, now));
        f(user)
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryStore {
    async fn find_or_create(&self, user_id: i64, now: DateTime<Utc>) -> Result<UserEntitlementEntity> {
        Ok(self.with_user(user_id, now, |user| user.clone()))
    }

    async fn evaluate_access(
        &self,
        user_id: i64,
        request: AccessRequest,
        log: AttemptLog,
    ) -> Result<AccessDecision> {
        Ok(self.with_user(user_id, request.now, |user| {
            let decision = access::evaluate_access(user, &request);
            if let Some((attempt_id, consumed_from)) = decision.allowed_attempt() {
                let row = log.into_row(attempt_id, user_id, consumed_from, request.now);
                self.attempts.lock().unwrap().insert(attempt_id, row.into());
            }
            decision
        }))
    }

    async fn refund_attempt(
        &self,
        user_id: i64,
        attempt_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AttemptRefund> {
        Ok(self.with_user(user_id, now, |user| {
            let mut attempts = self.attempts.lock().unwrap();
            match attempts.get_mut(&attempt_id) {
                Some(attempt) if attempt.user_id == user_id => {
                    attempts::refund_attempt(attempt, user, now)
                }
                _ => AttemptRefund::UnknownAttempt,
            }
        }))
    }

    async fn mutate(
        &self,
        user_id: i64,
        mutation: EntitlementMutation,
        now: DateTime<Utc>,
    ) -> Result<MutationOutcome> {
        Ok(self.with_user(user_id, now, |user| {
            let changed = mutation.apply(user);
            MutationOutcome {
                user: user.clone(),
                changed,
            }
        }))
    }

    async fn list_page(&self, page: i64, page_size: i64) -> Result<(Vec<UserEntitlementEntity>, i64)> {
        let users = self.users.lock().unwrap();
        let mut rows: Vec<_> = users.values().cloned().collect();
        rows.sort_by_key(|user| user.id);
        let total = rows.len() as i64;
        let rows = rows
            .into_iter()
            .skip((page * page_size) as usize)
            .take(page_size as usize)
            .collect();
        Ok((rows, total))
    }
}

#[async_trait]
impl AccessAttemptRepository for InMemoryStore {
    async fn finish(
        &self,
        user_id: i64,
        attempt_id: Uuid,
        outcome: AttemptOutcome,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut attempts = self.attempts.lock().unwrap();
        match attempts.get_mut(&attempt_id) {
            Some(attempt) if attempt.user_id == user_id && attempt.finished_at.is_none() => {
                attempt.finished_at = Some(now);
                attempt.success = Some(outcome.success);
                attempt.result_count = Some(outcome.result_count);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_page(&self, page: i64, page_size: i64) -> Result<(Vec<AccessAttemptEntity>, i64)> {
        let attempts = self.attempts.lock().unwrap();
        let mut rows: Vec<_> = attempts.values().cloned().collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        let total = rows.len() as i64;
        let rows = rows
            .into_iter()
            .skip((page * page_size) as usize)
            .take(page_size as usize)
            .collect();
        Ok((rows, total))
    }
}

#[async_trait]
impl PaymentLedgerRepository for InMemoryStore {
    async fn apply_payment(&self, payment: InsertPaymentEntity, effect: PlanEffect) -> Result<LedgerOutcome> {
        let mut payments = self.payments.lock().unwrap();
        if payments.contains_key(&payment.payload) {
            return Ok(LedgerOutcome::AlreadyApplied);
        }

        let now = payment.processed_at;
        let user = self.with_user(payment.user_id, now, |user| {
            effect.apply(user, now);
            user.clone()
        });
        payments.insert(
            payment.payload.clone(),
            PaymentEntity {
                payload: payment.payload,
                user_id: payment.user_id,
                plan: payment.plan,
                source: payment.source,
                paid_at: payment.paid_at,
                processed_at: payment.processed_at,
            },
        );

        Ok(LedgerOutcome::Applied { user })
    }

    async fn find_by_payload(&self, payload: String) -> Result<Option<PaymentEntity>> {
        Ok(self.payments.lock().unwrap().get(&payload).cloned())
    }
}

#[async_trait]
impl DenylistRepository for InMemoryStore {
    async fn contains_any(&self, values: Vec<String>) -> Result<bool> {
        let denylist = self.denylist.lock().unwrap();
        Ok(values.iter().any(|value| denylist.contains(value)))
    }

    async fn add_values(&self, values: Vec<String>) -> Result<usize> {
        let mut denylist = self.denylist.lock().unwrap();
        Ok(values.into_iter().filter(|value| denylist.insert(value.clone())).count())
    }

    async fn remove_values(&self, values: Vec<String>) -> Result<usize> {
        let mut denylist = self.denylist.lock().unwrap();
        Ok(values.iter().filter(|value| denylist.remove(*value)).count())
    }
}

#[async_trait]
impl BatchMutationRepository for InMemoryStore {
    async fn list_user_ids(&self) -> Result<Vec<i64>> {
        let mut ids: Vec<i64> = self.users.lock().unwrap().keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn apply_chunk(&self, user_ids: Vec<i64>, mutation: BatchMutation) -> Result<usize> {
        if *self.fail_chunks.lock().unwrap() {
            bail!("connection reset");
        }

        let mut users = self.users.lock().unwrap();
        let mut affected = 0;
        for id in user_ids {
            let Some(user) = users.get_mut(&id) else {
                continue;
            };
            match mutation {
                BatchMutation::ExpireTrials { trial_limit } => {
                    if !user.trial_expired || user.trial_used_count != trial_limit {
                        user.trial_used_count = trial_limit;
                        user.trial_expired = true;
                        affected += 1;
                    }
                }
                BatchMutation::AcknowledgeBoot { epoch } => {
                    if user.boot_acknowledged_at < epoch {
                        user.boot_acknowledged_at = epoch;
                        affected += 1;
                    }
                }
            }
        }
        Ok(affected)
    }
}

/// Records every notification; optionally fails all of them.
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub messages: Mutex<Vec<(i64, String)>>,
    pub reactivations: Mutex<Vec<i64>>,
    pub progress: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, user_id: i64, text: String) -> Result<()> {
        self.messages.lock().unwrap().push((user_id, text));
        if self.fail {
            bail!("relay unreachable");
        }
        Ok(())
    }

    async fn request_reactivation(&self, user_id: i64) -> Result<()> {
        self.reactivations.lock().unwrap().push(user_id);
        if self.fail {
            bail!("relay unreachable");
        }
        Ok(())
    }

    async fn report_progress(&self, handle: String, text: String) -> Result<()> {
        self.progress.lock().unwrap().push((handle, text));
        if self.fail {
            bail!("relay unreachable");
        }
        Ok(())
    }
}
