use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::users::UserEntitlementEntity;

/// What a user sees from `/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntitlementStatusDto {
    pub user_id: i64,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub subscription_active: bool,
    pub trial_remaining: i32,
    pub trial_expired: bool,
    pub manual_credits_remaining: i32,
    pub data_hidden: bool,
}

impl EntitlementStatusDto {
    pub fn from_entity(user: &UserEntitlementEntity, trial_limit: i32, now: DateTime<Utc>) -> Self {
        let trial_remaining = if user.trial_expired {
            0
        } else {
            (trial_limit - user.trial_used_count).max(0)
        };

        Self {
            user_id: user.id,
            subscription_expires_at: user.subscription_expires_at,
            subscription_active: user.has_active_subscription(now),
            trial_remaining,
            trial_expired: user.trial_expired,
            manual_credits_remaining: user.manual_credits_remaining,
            data_hidden: user.data_hidden,
        }
    }
}

/// Operator console row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminUserDto {
    pub id: i64,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub trial_used_count: i32,
    pub trial_expired: bool,
    pub manual_credits_remaining: i32,
    pub blocked: bool,
    pub data_hidden: bool,
    pub boot_acknowledged_at: DateTime<Utc>,
}

impl From<UserEntitlementEntity> for AdminUserDto {
    fn from(value: UserEntitlementEntity) -> Self {
        Self {
            id: value.id,
            subscription_expires_at: value.subscription_expires_at,
            trial_used_count: value.trial_used_count,
            trial_expired: value.trial_expired,
            manual_credits_remaining: value.manual_credits_remaining,
            blocked: value.blocked,
            data_hidden: value.data_hidden,
            boot_acknowledged_at: value.boot_acknowledged_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminUserPageDto {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub users: Vec<AdminUserDto>,
}
