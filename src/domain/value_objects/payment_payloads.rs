use std::fmt::Display;

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::value_objects::plans::Plan;

const INVOICE_PREFIX: &str = "pay";
const GRANT_PREFIX: &str = "grant";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Invoice,
    Grant,
}

impl PayloadKind {
    fn prefix(&self) -> &'static str {
        match self {
            PayloadKind::Invoice => INVOICE_PREFIX,
            PayloadKind::Grant => GRANT_PREFIX,
        }
    }
}

/// Idempotency key of a ledger credit.
///
/// Invoices use `pay_{user_id}_{plan}_{created_at_millis}-{nonce}`, operator grants use
/// `grant_{user_id}_{plan}_{uuid}`. Plan names may contain underscores, so the user id is
/// read after the prefix and the reference after the last underscore. Invoice references
/// written before the nonce was added are bare epoch seconds and still parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentPayload {
    pub kind: PayloadKind,
    pub user_id: i64,
    pub plan: Plan,
    pub reference: String,
}

impl PaymentPayload {
    pub fn for_invoice(user_id: i64, plan: Plan, created_at: DateTime<Utc>) -> Self {
        Self {
            kind: PayloadKind::Invoice,
            user_id,
            plan,
            reference: invoice_reference(created_at, Uuid::new_v4()),
        }
    }

    pub fn for_grant(user_id: i64, plan: Plan) -> Self {
        Self {
            kind: PayloadKind::Grant,
            user_id,
            plan,
            reference: Uuid::new_v4().to_string(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let (prefix, rest) = raw
            .split_once('_')
            .ok_or_else(|| anyhow!("Invalid payload: missing prefix"))?;
        let kind = match prefix {
            INVOICE_PREFIX => PayloadKind::Invoice,
            GRANT_PREFIX => PayloadKind::Grant,
            _ => bail!("Invalid payload: unknown prefix {}", prefix),
        };

        let (user_id, rest) = rest
            .split_once('_')
            .ok_or_else(|| anyhow!("Invalid payload: missing user id"))?;
        let user_id: i64 = user_id
            .parse()
            .map_err(|_| anyhow!("Invalid payload: user id is not numeric"))?;

        let (plan, reference) = rest
            .rsplit_once('_')
            .ok_or_else(|| anyhow!("Invalid payload: missing reference"))?;
        if reference.is_empty() {
            bail!("Invalid payload: empty reference");
        }
        if kind == PayloadKind::Invoice && !has_numeric_timestamp(reference) {
            bail!("Invalid payload: invoice timestamp is not numeric");
        }
        let plan = plan
            .parse::<Plan>()
            .map_err(|_| anyhow!("Invalid payload: unknown plan {}", plan))?;

        Ok(Self {
            kind,
            user_id,
            plan,
            reference: reference.to_string(),
        })
    }
}

fn invoice_reference(created_at: DateTime<Utc>, nonce: Uuid) -> String {
    let nonce = nonce.simple().to_string();
    format!("{}-{}", created_at.timestamp_millis(), &nonce[..8])
}

fn has_numeric_timestamp(reference: &str) -> bool {
    match reference.split_once('-') {
        Some((timestamp, nonce)) => {
            timestamp.parse::<i64>().is_ok()
                && !nonce.is_empty()
                && nonce.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => reference.parse::<i64>().is_ok(),
    }
}

impl Display for PaymentPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.kind.prefix(),
            self.user_id,
            self.plan.as_str(),
            self.reference
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_invoice_payload() {
        let payload = PaymentPayload::parse("pay_42_month_1690000000").unwrap();

        assert_eq!(payload.kind, PayloadKind::Invoice);
        assert_eq!(payload.user_id, 42);
        assert_eq!(payload.plan, Plan::Month);
        assert_eq!(payload.reference, "1690000000");
    }

    #[test]
    fn parses_plan_with_underscore() {
        let payload = PaymentPayload::parse("pay_7_hide_data_1690000000").unwrap();

        assert_eq!(payload.user_id, 7);
        assert_eq!(payload.plan, Plan::HideData);
    }

    #[test]
    fn grant_payload_formats_and_parses() {
        let grant = PaymentPayload::for_grant(9, Plan::Quarter);
        let raw = grant.to_string();

        assert!(raw.starts_with("grant_9_quarter_"));
        assert_eq!(PaymentPayload::parse(&raw).unwrap(), grant);
    }

    #[test]
    fn invoice_payload_leads_with_epoch_millis() {
        let created = Utc.timestamp_opt(1_690_000_000, 250_000_000).unwrap();
        let payload = PaymentPayload::for_invoice(42, Plan::Lifetime, created);
        let raw = payload.to_string();

        assert!(raw.starts_with("pay_42_lifetime_1690000000250-"), "{}", raw);
        assert_eq!(PaymentPayload::parse(&raw).unwrap(), payload);
    }

    #[test]
    fn invoices_in_the_same_second_get_distinct_payloads() {
        let first = PaymentPayload::for_invoice(42, Plan::Month, Utc.timestamp_opt(1_700_000_000, 100_000_000).unwrap());
        let second = PaymentPayload::for_invoice(42, Plan::Month, Utc.timestamp_opt(1_700_000_000, 900_000_000).unwrap());
        let same_instant = PaymentPayload::for_invoice(42, Plan::Month, Utc.timestamp_opt(1_700_000_000, 900_000_000).unwrap());

        assert_ne!(first.to_string(), second.to_string());
        assert_ne!(second.to_string(), same_instant.to_string());
    }

    #[test]
    fn rejects_malformed_payloads() {
        for raw in [
            "",
            "pay",
            "pay_42",
            "pay_abc_month_1690000000",
            "pay_42_weekly_1690000000",
            "pay_42_month_",
            "pay_42_month_soon",
            "pay_42_month_soon-1a2b3c4d",
            "pay_42_month_1690000000-",
            "refund_42_month_1690000000",
            "pay_42_1690000000",
        ] {
            assert!(PaymentPayload::parse(raw).is_err(), "{} should be rejected", raw);
        }
    }
}
