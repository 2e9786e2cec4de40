use std::{fmt::Display, str::FromStr};

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::users::UserEntitlementEntity;
use crate::domain::value_objects::{boot_epoch::BootEpoch, flood_guard::{FloodGuard, FloodPolicy}};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsumedFrom {
    Manual,
    Subscription,
    Trial,
    Operator,
}

impl ConsumedFrom {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumedFrom::Manual => "manual",
            ConsumedFrom::Subscription => "subscription",
            ConsumedFrom::Trial => "trial",
            ConsumedFrom::Operator => "operator",
        }
    }
}

impl FromStr for ConsumedFrom {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "manual" => Ok(ConsumedFrom::Manual),
            "subscription" => Ok(ConsumedFrom::Subscription),
            "trial" => Ok(ConsumedFrom::Trial),
            "operator" => Ok(ConsumedFrom::Operator),
            _ => bail!("unknown quota source {}", value),
        }
    }
}

impl Display for ConsumedFrom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    ReactivationRequired,
    Blocked,
    Hidden,
    Prohibited,
    Flood,
    TrialExhausted,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::ReactivationRequired => "reactivation_required",
            DenyReason::Blocked => "blocked",
            DenyReason::Hidden => "hidden",
            DenyReason::Prohibited => "prohibited",
            DenyReason::Flood => "flood",
            DenyReason::TrialExhausted => "trial_exhausted",
        }
    }

    /// Text shown to the end user. None of these are retryable as-is.
    pub fn user_message(&self) -> &'static str {
        match self {
            DenyReason::ReactivationRequired => "The service was restarted. Press /start to continue.",
            DenyReason::Blocked => "Access is blocked.",
            DenyReason::Hidden => "Data for this account is hidden.",
            DenyReason::Prohibited => "Access denied.",
            DenyReason::Flood => "Too many requests. Please slow down.",
            DenyReason::TrialExhausted => "Trial is over. Please subscribe.",
        }
    }
}

impl Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    Allow { consumed_from: ConsumedFrom, attempt_id: Uuid },
    Deny { reason: DenyReason },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow { .. })
    }

    pub fn allowed_attempt(&self) -> Option<(Uuid, ConsumedFrom)> {
        match *self {
            AccessDecision::Allow {
                consumed_from,
                attempt_id,
            } => Some((attempt_id, consumed_from)),
            AccessDecision::Deny { .. } => None,
        }
    }
}

/// Everything the locked-row evaluation needs besides the row itself. The denylist hit
/// is looked up beforehand and passed in as `prohibited`. An allowed attempt is logged
/// under `attempt_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRequest {
    pub attempt_id: Uuid,
    pub now: DateTime<Utc>,
    pub boot_epoch: BootEpoch,
    pub privileged: bool,
    pub prohibited: bool,
    pub trial_limit: i32,
    pub flood_policy: FloodPolicy,
}

/// Decides one access attempt and applies its side effects to `user`.
///
/// Operators skip every check except the denylist. For everyone else the order is boot
/// acknowledgement, block, hide, denylist, flood, then quota: manual credits, active
/// subscription, trial.
pub fn evaluate_access(user: &mut UserEntitlementEntity, request: &AccessRequest) -> AccessDecision {
    if request.privileged {
        return if request.prohibited {
            AccessDecision::Deny { reason: DenyReason::Prohibited }
        } else {
            allow(request, ConsumedFrom::Operator)
        };
    }

    if !request.boot_epoch.is_acknowledged(user.boot_acknowledged_at) {
        return AccessDecision::Deny { reason: DenyReason::ReactivationRequired };
    }
    if user.blocked {
        return AccessDecision::Deny { reason: DenyReason::Blocked };
    }
    if user.data_hidden {
        return AccessDecision::Deny { reason: DenyReason::Hidden };
    }
    if request.prohibited {
        return AccessDecision::Deny { reason: DenyReason::Prohibited };
    }

    let mut guard = FloodGuard::from_history(request.flood_policy, &user.recent_request_timestamps);
    let flooded = guard.check(request.now.timestamp());
    user.recent_request_timestamps = guard.into_history();
    if flooded {
        return AccessDecision::Deny { reason: DenyReason::Flood };
    }

    if user.manual_credits_remaining > 0 {
        user.manual_credits_remaining -= 1;
        return allow(request, ConsumedFrom::Manual);
    }
    if user.has_active_subscription(request.now) {
        return allow(request, ConsumedFrom::Subscription);
    }
    if user.trial_expired {
        return AccessDecision::Deny { reason: DenyReason::TrialExhausted };
    }
    if user.trial_used_count < request.trial_limit {
        user.trial_used_count += 1;
        if user.trial_used_count >= request.trial_limit {
            user.trial_expired = true;
        }
        return allow(request, ConsumedFrom::Trial);
    }

    user.trial_expired = true;
    AccessDecision::Deny { reason: DenyReason::TrialExhausted }
}

fn allow(request: &AccessRequest, consumed_from: ConsumedFrom) -> AccessDecision {
    AccessDecision::Allow {
        consumed_from,
        attempt_id: request.attempt_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    const ATTEMPT: Uuid = Uuid::from_u128(7);

    fn request() -> AccessRequest {
        AccessRequest {
            attempt_id: ATTEMPT,
            now: now(),
            boot_epoch: BootEpoch::new(now() - Duration::hours(1)),
            privileged: false,
            prohibited: false,
            trial_limit: 3,
            flood_policy: FloodPolicy {
                min_interval_seconds: 0,
                ..FloodPolicy::default()
            },
        }
    }

    fn acknowledged_user() -> UserEntitlementEntity {
        let mut user = UserEntitlementEntity::new_default(42, now() - Duration::days(1));
        user.boot_acknowledged_at = now() - Duration::minutes(30);
        user
    }

    fn deny(reason: DenyReason) -> AccessDecision {
        AccessDecision::Deny { reason }
    }

    fn allowed(consumed_from: ConsumedFrom) -> AccessDecision {
        AccessDecision::Allow {
            consumed_from,
            attempt_id: ATTEMPT,
        }
    }

    #[test]
    fn last_trial_unit_expires_the_trial() {
        let mut user = acknowledged_user();
        user.trial_used_count = 2;

        assert_eq!(evaluate_access(&mut user, &request()), allowed(ConsumedFrom::Trial));
        assert_eq!(user.trial_used_count, 3);
        assert!(user.trial_expired);

        let mut next = request();
        next.now = now() + Duration::seconds(5);
        assert_eq!(evaluate_access(&mut user, &next), deny(DenyReason::TrialExhausted));
        assert_eq!(user.trial_used_count, 3);
    }

    #[test]
    fn trial_usage_is_bounded_by_limit() {
        let mut user = acknowledged_user();
        let mut allowed = 0;
        for i in 0..8 {
            let mut req = request();
            req.now = now() + Duration::seconds(i * 5);
            if evaluate_access(&mut user, &req).is_allowed() {
                allowed += 1;
            }
            assert_eq!(user.trial_used_count, (i as i32 + 1).min(3));
            assert_eq!(user.trial_expired, i + 1 >= 3);
        }
        assert_eq!(allowed, 3);
    }

    #[test]
    fn stale_acknowledgement_requires_reactivation() {
        let mut user = UserEntitlementEntity::new_default(42, now());
        user.manual_credits_remaining = 1;

        assert_eq!(evaluate_access(&mut user, &request()), deny(DenyReason::ReactivationRequired));
        assert_eq!(user.manual_credits_remaining, 1);
        assert!(user.recent_request_timestamps.is_empty());
    }

    #[test]
    fn checks_run_in_priority_order() {
        let mut user = acknowledged_user();
        user.blocked = true;
        user.data_hidden = true;
        let mut req = request();
        req.prohibited = true;
        assert_eq!(evaluate_access(&mut user, &req), deny(DenyReason::Blocked));

        user.blocked = false;
        assert_eq!(evaluate_access(&mut user, &req), deny(DenyReason::Hidden));

        user.data_hidden = false;
        assert_eq!(evaluate_access(&mut user, &req), deny(DenyReason::Prohibited));
        assert!(user.recent_request_timestamps.is_empty());
    }

    #[test]
    fn manual_credits_are_spent_before_subscription() {
        let mut user = acknowledged_user();
        user.manual_credits_remaining = 1;
        user.subscription_expires_at = Some(now() + Duration::days(3));

        assert_eq!(evaluate_access(&mut user, &request()), allowed(ConsumedFrom::Manual));
        assert_eq!(user.manual_credits_remaining, 0);

        let mut req = request();
        req.now = now() + Duration::seconds(5);
        assert_eq!(evaluate_access(&mut user, &req), allowed(ConsumedFrom::Subscription));
        assert_eq!(user.trial_used_count, 0);
    }

    #[test]
    fn subscription_allows_even_after_trial_expired() {
        let mut user = acknowledged_user();
        user.trial_expired = true;
        user.subscription_expires_at = Some(now() + Duration::days(1));

        assert_eq!(evaluate_access(&mut user, &request()), allowed(ConsumedFrom::Subscription));
    }

    #[test]
    fn flood_is_checked_before_quota_and_records_attempt() {
        let mut user = acknowledged_user();
        user.manual_credits_remaining = 5;
        let mut req = request();
        req.flood_policy.min_interval_seconds = 3;

        assert_eq!(evaluate_access(&mut user, &req), allowed(ConsumedFrom::Manual));
        req.now = now() + Duration::seconds(1);
        assert_eq!(evaluate_access(&mut user, &req), deny(DenyReason::Flood));
        assert_eq!(user.manual_credits_remaining, 4);
        assert_eq!(user.recent_request_timestamps.len(), 2);
    }

    #[test]
    fn exhausted_counter_without_flag_sets_the_flag() {
        let mut user = acknowledged_user();
        user.trial_used_count = 3;

        assert_eq!(evaluate_access(&mut user, &request()), deny(DenyReason::TrialExhausted));
        assert!(user.trial_expired);
    }

    #[test]
    fn operators_bypass_everything_but_the_denylist() {
        let mut user = UserEntitlementEntity::new_default(1, now());
        user.blocked = true;
        user.trial_expired = true;
        let mut req = request();
        req.privileged = true;

        assert_eq!(evaluate_access(&mut user, &req), allowed(ConsumedFrom::Operator));
        assert!(user.recent_request_timestamps.is_empty());

        req.prohibited = true;
        assert_eq!(evaluate_access(&mut user, &req), deny(DenyReason::Prohibited));
    }

    #[test]
    fn quota_sources_parse_from_their_names() {
        for source in [
            ConsumedFrom::Manual,
            ConsumedFrom::Subscription,
            ConsumedFrom::Trial,
            ConsumedFrom::Operator,
        ] {
            assert_eq!(source.as_str().parse::<ConsumedFrom>().unwrap(), source);
        }
        assert!("credits".parse::<ConsumedFrom>().is_err());
    }
}
