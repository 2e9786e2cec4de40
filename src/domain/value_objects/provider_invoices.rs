use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::value_objects::enums::invoice_statuses::InvoiceStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateInvoiceRequest {
    pub asset: String,
    pub amount: String,
    pub description: String,
    pub payload: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedInvoice {
    pub invoice_id: String,
    pub pay_url: String,
}

/// Invoice as reported by the payment provider, either from the list endpoint or from a
/// webhook body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInvoice {
    pub invoice_id: Option<String>,
    pub payload: Option<String>,
    pub status: InvoiceStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

impl ProviderInvoice {
    /// Reads one invoice object. Ids may arrive as numbers or strings; `paid_at` as epoch
    /// seconds or RFC 3339.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        let invoice_id = object
            .get("invoice_id")
            .or_else(|| object.get("id"))
            .and_then(scalar_to_string);
        let payload = object
            .get("payload")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|payload| !payload.is_empty());
        let status = object
            .get("status")
            .and_then(Value::as_str)
            .map(|status| status.parse().unwrap_or(InvoiceStatus::Expired))?;
        let paid_at = object.get("paid_at").and_then(parse_paid_at);

        Some(Self {
            invoice_id,
            payload,
            status,
            paid_at,
        })
    }

    /// Accepts the invoice under `invoice`, under `payload` as an update envelope, or as
    /// the body itself.
    pub fn from_webhook_body(body: &Value) -> Option<Self> {
        if let Some(invoice) = body.get("invoice").filter(|v| v.is_object()) {
            return Self::from_json(invoice);
        }
        if let Some(invoice) = body.get("payload").filter(|v| v.is_object()) {
            return Self::from_json(invoice);
        }
        Self::from_json(body)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn parse_paid_at(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().filter(|ts| *ts > 0).and_then(|ts| DateTime::from_timestamp(ts, 0)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = s.parse::<i64>() {
                return (ts > 0).then(|| DateTime::from_timestamp(ts, 0)).flatten();
            }
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }
        _ => None,
    }
}
