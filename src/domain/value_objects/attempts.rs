use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::{
        access_attempts::{AccessAttemptEntity, InsertAccessAttemptEntity},
        users::UserEntitlementEntity,
    },
    value_objects::{
        access::ConsumedFrom, entitlement_mutations::EntitlementMutation, query_values,
    },
};

/// Query text recorded with an allowed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptLog {
    pub query: String,
    pub normalized_query: Option<String>,
}

impl AttemptLog {
    pub fn from_query(raw: &str) -> Self {
        let query = raw.trim().to_string();
        let normalized_query = query_values::normalize_phone(&query);
        Self {
            query,
            normalized_query,
        }
    }

    pub fn into_row(
        self,
        attempt_id: Uuid,
        user_id: i64,
        consumed_from: ConsumedFrom,
        now: DateTime<Utc>,
    ) -> InsertAccessAttemptEntity {
        InsertAccessAttemptEntity {
            id: attempt_id,
            user_id,
            query: self.query,
            normalized_query: self.normalized_query,
            consumed_from: consumed_from.as_str().to_string(),
            created_at: now,
        }
    }
}

/// Downstream result reported by the caller once the metered action completes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub success: bool,
    pub result_count: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptRefund {
    /// The attempt is now marked refunded. `restored` is false when its source had
    /// nothing to give back (subscription, operator, or an already expired trial).
    Refunded { restored: bool },
    AlreadyRefunded,
    Succeeded,
    UnknownAttempt,
}

/// Marks `attempt` refunded and restores exactly what it consumed from `user`. An attempt
/// is refunded at most once, and never after it was reported successful.
pub fn refund_attempt(
    attempt: &mut AccessAttemptEntity,
    user: &mut UserEntitlementEntity,
    now: DateTime<Utc>,
) -> AttemptRefund {
    if attempt.refunded_at.is_some() {
        return AttemptRefund::AlreadyRefunded;
    }
    if attempt.success == Some(true) {
        return AttemptRefund::Succeeded;
    }

    attempt.refunded_at = Some(now);
    let restored = match attempt.consumed_from.parse::<ConsumedFrom>() {
        Ok(consumed_from) => EntitlementMutation::Refund { consumed_from }.apply(user),
        Err(_) => false,
    };
    AttemptRefund::Refunded { restored }
}

/// Operator history row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessAttemptDto {
    pub id: Uuid,
    pub user_id: i64,
    pub query: String,
    pub normalized_query: Option<String>,
    pub consumed_from: String,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub success: Option<bool>,
    pub result_count: Option<i32>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl From<AccessAttemptEntity> for AccessAttemptDto {
    fn from(value: AccessAttemptEntity) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            query: value.query,
            normalized_query: value.normalized_query,
            consumed_from: value.consumed_from,
            created_at: value.created_at,
            finished_at: value.finished_at,
            success: value.success,
            result_count: value.result_count,
            refunded_at: value.refunded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttemptHistoryPageDto {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub attempts: Vec<AccessAttemptDto>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn attempt(consumed_from: ConsumedFrom) -> AccessAttemptEntity {
        AttemptLog::from_query("query")
            .into_row(Uuid::from_u128(1), 8, consumed_from, now())
            .into()
    }

    #[test]
    fn log_keeps_normalized_phone() {
        let log = AttemptLog::from_query("  +38 (063) 665-92-55 ");

        assert_eq!(log.query, "+38 (063) 665-92-55");
        assert_eq!(log.normalized_query.as_deref(), Some("380636659255"));
        assert_eq!(AttemptLog::from_query("Ivanov").normalized_query, None);
    }

    #[test]
    fn manual_attempt_is_refunded_once() {
        let mut user = UserEntitlementEntity::new_default(8, now());
        let mut manual = attempt(ConsumedFrom::Manual);

        assert_eq!(
            refund_attempt(&mut manual, &mut user, now()),
            AttemptRefund::Refunded { restored: true }
        );
        assert_eq!(refund_attempt(&mut manual, &mut user, now()), AttemptRefund::AlreadyRefunded);
        assert_eq!(user.manual_credits_remaining, 1);
    }

    #[test]
    fn subscription_attempt_restores_nothing() {
        let mut user = UserEntitlementEntity::new_default(8, now());
        let mut covered = attempt(ConsumedFrom::Subscription);

        assert_eq!(
            refund_attempt(&mut covered, &mut user, now()),
            AttemptRefund::Refunded { restored: false }
        );
        assert_eq!(user.manual_credits_remaining, 0);
        assert_eq!(covered.refunded_at, Some(now()));
    }

    #[test]
    fn successful_attempt_is_not_refundable() {
        let mut user = UserEntitlementEntity::new_default(8, now());
        user.trial_used_count = 1;
        let mut trial = attempt(ConsumedFrom::Trial);
        trial.success = Some(true);

        assert_eq!(refund_attempt(&mut trial, &mut user, now()), AttemptRefund::Succeeded);
        assert_eq!(user.trial_used_count, 1);
        assert_eq!(trial.refunded_at, None);
    }
}
