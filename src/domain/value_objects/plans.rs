use std::{fmt::Display, str::FromStr};

use anyhow::anyhow;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::users::UserEntitlementEntity;

/// Static plan catalog. Prices are whole units of the configured invoice asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Month,
    Quarter,
    Lifetime,
    HideData,
}

/// What crediting a plan does to an entitlement record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanEffect {
    ExtendSubscription { days: i64 },
    HideData,
}

pub const PLAN_CATALOG: [Plan; 4] = [Plan::Month, Plan::Quarter, Plan::Lifetime, Plan::HideData];

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Month => "month",
            Plan::Quarter => "quarter",
            Plan::Lifetime => "lifetime",
            Plan::HideData => "hide_data",
        }
    }

    pub fn price(&self) -> u32 {
        match self {
            Plan::Month => 49,
            Plan::Quarter => 120,
            Plan::Lifetime => 299,
            Plan::HideData => 100,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Plan::Month => "29 days",
            Plan::Quarter => "89 days",
            Plan::Lifetime => "Lifetime",
            Plan::HideData => "Hide my data",
        }
    }

    pub fn effect(&self) -> PlanEffect {
        match self {
            Plan::Month => PlanEffect::ExtendSubscription { days: 29 },
            Plan::Quarter => PlanEffect::ExtendSubscription { days: 89 },
            Plan::Lifetime => PlanEffect::ExtendSubscription { days: 9999 },
            Plan::HideData => PlanEffect::HideData,
        }
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PLAN_CATALOG
            .into_iter()
            .find(|plan| plan.as_str() == value)
            .ok_or_else(|| anyhow!("unknown plan {}", value))
    }
}

impl PlanEffect {
    /// Applies the effect in place. Subscriptions stack from the later of `now` and the
    /// current expiry, so an extension never shortens what was already paid for.
    pub fn apply(&self, user: &mut UserEntitlementEntity, now: DateTime<Utc>) {
        match *self {
            PlanEffect::ExtendSubscription { days } => {
                let base = match user.subscription_expires_at {
                    Some(expires_at) if expires_at > now => expires_at,
                    _ => now,
                };
                user.subscription_expires_at = Some(base + Duration::days(days));
            }
            PlanEffect::HideData => {
                user.data_hidden = true;
            }
        }
    }
}
