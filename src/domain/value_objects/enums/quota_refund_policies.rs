use std::{fmt::Display, str::FromStr};

use anyhow::bail;

use serde::{Deserialize, Serialize};

/// What happens to a debited quota unit when the downstream call fails.
///
/// `Never` keeps the debit (attempts are billable). `OnFailure` lets the caller hand the
/// unit back with [`EntitlementMutation::Refund`](crate::domain::value_objects::entitlement_mutations::EntitlementMutation::Refund).
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuotaRefundPolicy {
    #[default]
    Never,
    OnFailure,
}

impl FromStr for QuotaRefundPolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(QuotaRefundPolicy::Never),
            "on_failure" | "on-failure" => Ok(QuotaRefundPolicy::OnFailure),
            _ => bail!("unknown quota refund policy {}", value),
        }
    }
}

impl Display for QuotaRefundPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let policy = match self {
            QuotaRefundPolicy::Never => "never",
            QuotaRefundPolicy::OnFailure => "on_failure",
        };
        write!(f, "{}", policy)
    }
}
