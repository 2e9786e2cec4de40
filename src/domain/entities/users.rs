use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infrastructure::postgres::schema::users;

/// One entitlement record per external identity. Rows are created lazily and never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users)]
pub struct UserEntitlementEntity {
    pub id: i64,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub trial_used_count: i32,
    pub trial_expired: bool,
    pub manual_credits_remaining: i32,
    pub blocked: bool,
    pub data_hidden: bool,
    pub recent_request_timestamps: Vec<i64>,
    pub boot_acknowledged_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserEntitlementEntity {
    /// Default row for a user seen for the first time. The acknowledgement sits at the Unix
    /// epoch so a brand-new user always has to complete a handshake first.
    pub fn new_default(id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            subscription_expires_at: None,
            trial_used_count: 0,
            trial_expired: false,
            manual_credits_remaining: 0,
            blocked: false,
            data_hidden: false,
            recent_request_timestamps: Vec::new(),
            boot_acknowledged_at: DateTime::<Utc>::UNIX_EPOCH,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.subscription_expires_at
            .is_some_and(|expires_at| expires_at > now)
    }

    pub fn changeset(&self, now: DateTime<Utc>) -> UpdateUserEntitlementEntity {
        UpdateUserEntitlementEntity {
            subscription_expires_at: self.subscription_expires_at,
            trial_used_count: self.trial_used_count,
            trial_expired: self.trial_expired,
            manual_credits_remaining: self.manual_credits_remaining,
            blocked: self.blocked,
            data_hidden: self.data_hidden,
            recent_request_timestamps: self.recent_request_timestamps.clone(),
            boot_acknowledged_at: self.boot_acknowledged_at,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct InsertUserEntitlementEntity {
    pub id: i64,
    pub boot_acknowledged_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InsertUserEntitlementEntity {
    pub fn new(id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            boot_acknowledged_at: DateTime::<Utc>::UNIX_EPOCH,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Full-row write used after a locked read-modify-write.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub struct UpdateUserEntitlementEntity {
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub trial_used_count: i32,
    pub trial_expired: bool,
    pub manual_credits_remaining: i32,
    pub blocked: bool,
    pub data_hidden: bool,
    pub recent_request_timestamps: Vec<i64>,
    pub boot_acknowledged_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
