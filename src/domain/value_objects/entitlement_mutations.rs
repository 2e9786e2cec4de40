use chrono::{DateTime, Utc};

use crate::domain::entities::users::UserEntitlementEntity;
use crate::domain::value_objects::access::ConsumedFrom;

pub const MIN_MANUAL_CREDITS: i32 = 1;
pub const MAX_MANUAL_CREDITS: i32 = 100;

/// Single-row change applied to a locked entitlement record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitlementMutation {
    SetBlocked(bool),
    SetHidden(bool),
    /// Replaces the remaining manual credit count.
    GrantManualCredits(i32),
    ExpireTrial { trial_limit: i32 },
    /// The only path that clears `trial_expired`.
    RestoreTrial,
    AcknowledgeBoot { epoch: DateTime<Utc> },
    Refund { consumed_from: ConsumedFrom },
}

impl EntitlementMutation {
    pub fn name(&self) -> &'static str {
        match self {
            EntitlementMutation::SetBlocked(_) => "set_blocked",
            EntitlementMutation::SetHidden(_) => "set_hidden",
            EntitlementMutation::GrantManualCredits(_) => "grant_manual_credits",
            EntitlementMutation::ExpireTrial { .. } => "expire_trial",
            EntitlementMutation::RestoreTrial => "restore_trial",
            EntitlementMutation::AcknowledgeBoot { .. } => "acknowledge_boot",
            EntitlementMutation::Refund { .. } => "refund",
        }
    }

    /// Applies the mutation and returns whether the record changed.
    pub fn apply(&self, user: &mut UserEntitlementEntity) -> bool {
        let before = user.clone();

        match *self {
            EntitlementMutation::SetBlocked(value) => user.blocked = value,
            EntitlementMutation::SetHidden(value) => user.data_hidden = value,
            EntitlementMutation::GrantManualCredits(amount) => {
                user.manual_credits_remaining = amount.clamp(MIN_MANUAL_CREDITS, MAX_MANUAL_CREDITS);
            }
            EntitlementMutation::ExpireTrial { trial_limit } => {
                user.trial_used_count = trial_limit;
                user.trial_expired = true;
            }
            EntitlementMutation::RestoreTrial => {
                user.trial_used_count = 0;
                user.trial_expired = false;
            }
            EntitlementMutation::AcknowledgeBoot { epoch } => {
                if user.boot_acknowledged_at < epoch {
                    user.boot_acknowledged_at = epoch;
                }
            }
            EntitlementMutation::Refund { consumed_from } => match consumed_from {
                ConsumedFrom::Manual => {
                    user.manual_credits_remaining = (user.manual_credits_remaining + 1).min(MAX_MANUAL_CREDITS);
                }
                ConsumedFrom::Trial => {
                    if !user.trial_expired && user.trial_used_count > 0 {
                        user.trial_used_count -= 1;
                    }
                }
                ConsumedFrom::Subscription | ConsumedFrom::Operator => {}
            },
        }

        *user != before
    }
}
