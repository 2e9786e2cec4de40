use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Where a ledger credit came from. Stored on every `payments` row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSource {
    Webhook,
    Reconcile,
    Admin,
}

impl PaymentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentSource::Webhook => "webhook",
            PaymentSource::Reconcile => "reconcile",
            PaymentSource::Admin => "admin",
        }
    }
}

impl Display for PaymentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
