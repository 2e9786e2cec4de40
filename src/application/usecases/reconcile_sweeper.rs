use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::{
    entitlement_errors::{EntitlementError, UseCaseResult},
    payment_ledger::PaymentLedgerUseCase,
};
use crate::domain::{
    repositories::payment_provider::PaymentProviderClient,
    value_objects::{
        enums::{invoice_statuses::InvoiceStatus, payment_sources::PaymentSource},
        ledger::LedgerOutcome,
        payment_payloads::PaymentPayload,
    },
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub fetched: usize,
    pub applied: usize,
    pub already_applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Replays paid invoices the webhook may have missed through the ledger.
pub struct ReconcileSweeperUseCase {
    provider: Arc<dyn PaymentProviderClient + Send + Sync>,
    ledger: Arc<PaymentLedgerUseCase>,
    window_hours: i64,
    page_size: u32,
}

impl ReconcileSweeperUseCase {
    pub fn new(
        provider: Arc<dyn PaymentProviderClient + Send + Sync>,
        ledger: Arc<PaymentLedgerUseCase>,
        window_hours: i64,
        page_size: u32,
    ) -> Self {
        Self {
            provider,
            ledger,
            window_hours,
            page_size,
        }
    }

    /// A provider failure aborts this attempt only; per-invoice failures are counted and
    /// skipped.
    pub async fn sweep(&self, now: DateTime<Utc>) -> UseCaseResult<SweepReport> {
        let since = now - Duration::hours(self.window_hours);

        let invoices = self
            .provider
            .get_paid_invoices(self.page_size)
            .await
            .map_err(|err| {
                warn!(error = ?err, "reconcile_sweeper: provider request failed");
                EntitlementError::ProviderUnavailable(err)
            })?;

        let mut report = SweepReport {
            fetched: invoices.len(),
            ..Default::default()
        };

        for invoice in invoices {
            if invoice.status != InvoiceStatus::Paid {
                report.skipped += 1;
                continue;
            }
            if invoice.paid_at.is_some_and(|paid_at| paid_at < since) {
                report.skipped += 1;
                continue;
            }
            let Some(raw_payload) = invoice.payload.as_deref() else {
                report.skipped += 1;
                continue;
            };
            let payload = match PaymentPayload::parse(raw_payload) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(payload = %raw_payload, error = %err, "reconcile_sweeper: unrecognised payload");
                    report.skipped += 1;
                    continue;
                }
            };

            let paid_at = invoice.paid_at.unwrap_or(now);
            match self.ledger.credit(&payload, paid_at, PaymentSource::Reconcile).await {
                Ok(LedgerOutcome::Applied { .. }) => report.applied += 1,
                Ok(LedgerOutcome::AlreadyApplied) => report.already_applied += 1,
                Err(err) => {
                    error!(payload = %raw_payload, error = ?err, "reconcile_sweeper: credit failed; continuing");
                    report.failed += 1;
                }
            }
        }

        info!(
            fetched = report.fetched,
            applied = report.applied,
            already_applied = report.already_applied,
            skipped = report.skipped,
            failed = report.failed,
            "reconcile_sweeper: sweep finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::usecases::testing::{InMemoryStore, RecordingNotifier},
        domain::{
            entities::{payments::InsertPaymentEntity, users::UserEntitlementEntity},
            repositories::{
                payment_provider::MockPaymentProviderClient,
                payments::{MockPaymentLedgerRepository, PaymentLedgerRepository},
            },
            value_objects::provider_invoices::ProviderInvoice,
        },
    };
    use chrono::TimeZone;
    use mockall::predicate::eq;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn paid(payload: &str, paid_at: DateTime<Utc>) -> ProviderInvoice {
        ProviderInvoice {
            invoice_id: Some("1".to_string()),
            payload: Some(payload.to_string()),
            status: InvoiceStatus::Paid,
            paid_at: Some(paid_at),
        }
    }

    fn provider_with(invoices: Vec<ProviderInvoice>) -> MockPaymentProviderClient {
        let mut provider = MockPaymentProviderClient::new();
        provider
            .expect_get_paid_invoices()
            .with(eq(100))
            .returning(move |_| Ok(invoices.clone()));
        provider
    }

    #[tokio::test]
    async fn sweep_applies_missed_payments_inside_window() {
        let store = Arc::new(InMemoryStore::default());
        let ledger = Arc::new(PaymentLedgerUseCase::new(store.clone(), Arc::new(RecordingNotifier::default())));
        let provider = provider_with(vec![
            paid("pay_1_month_1699990000", now() - Duration::hours(2)),
            paid("pay_2_quarter_1690000000", now() - Duration::hours(30)),
            ProviderInvoice {
                invoice_id: Some("3".to_string()),
                payload: None,
                status: InvoiceStatus::Paid,
                paid_at: Some(now()),
            },
            paid("checkout-17", now()),
            ProviderInvoice {
                invoice_id: Some("4".to_string()),
                payload: Some("pay_4_month_1699990000".to_string()),
                status: InvoiceStatus::Expired,
                paid_at: None,
            },
        ]);
        let sweeper = ReconcileSweeperUseCase::new(Arc::new(provider), ledger, 24, 100);

        let report = sweeper.sweep(now()).await.unwrap();

        assert_eq!(
            report,
            SweepReport {
                fetched: 5,
                applied: 1,
                already_applied: 0,
                skipped: 4,
                failed: 0,
            }
        );
        assert!(store.user(1).unwrap().subscription_expires_at.is_some());
        assert!(store.user(2).is_none());
        let stored = store.find_by_payload("pay_1_month_1699990000".to_string()).await.unwrap().unwrap();
        assert_eq!(stored.source, "reconcile");
        assert_eq!(stored.paid_at, now() - Duration::hours(2));

        let rerun = sweeper.sweep(now()).await.unwrap();
        assert_eq!((rerun.applied, rerun.already_applied), (0, 1));
    }

    #[tokio::test]
    async fn payment_seen_by_webhook_is_not_applied_again() {
        let store = Arc::new(InMemoryStore::default());
        let ledger = Arc::new(PaymentLedgerUseCase::new(store.clone(), Arc::new(RecordingNotifier::default())));
        let payload = PaymentPayload::parse("pay_42_month_1690000000").unwrap();
        ledger.credit(&payload, now(), PaymentSource::Webhook).await.unwrap();
        let expires_at = store.user(42).unwrap().subscription_expires_at;

        let sweeper = ReconcileSweeperUseCase::new(
            Arc::new(provider_with(vec![paid("pay_42_month_1690000000", now())])),
            ledger,
            24,
            100,
        );
        let report = sweeper.sweep(now()).await.unwrap();

        assert_eq!(report.already_applied, 1);
        assert_eq!(store.user(42).unwrap().subscription_expires_at, expires_at);
    }

    #[tokio::test]
    async fn one_failing_item_does_not_stop_the_sweep() {
        let mut repo = MockPaymentLedgerRepository::new();
        repo.expect_apply_payment()
            .times(2)
            .returning(|payment: InsertPaymentEntity, _| {
                if payment.user_id == 13 {
                    return Err(anyhow::anyhow!("serialization failure"));
                }
                Ok(LedgerOutcome::Applied {
                    user: UserEntitlementEntity::new_default(payment.user_id, payment.processed_at),
                })
            });
        let ledger = Arc::new(PaymentLedgerUseCase::new(Arc::new(repo), Arc::new(RecordingNotifier::default())));
        let provider = provider_with(vec![
            paid("pay_13_month_1699990000", now()),
            paid("pay_14_month_1699990000", now()),
        ]);
        let sweeper = ReconcileSweeperUseCase::new(Arc::new(provider), ledger, 24, 100);

        let report = sweeper.sweep(now()).await.unwrap();

        assert_eq!((report.applied, report.failed), (1, 1));
    }

    #[tokio::test]
    async fn provider_failure_aborts_the_attempt() {
        let mut provider = MockPaymentProviderClient::new();
        provider
            .expect_get_paid_invoices()
            .returning(|_| Err(anyhow::anyhow!("cryptopay request timed out")));
        let ledger = Arc::new(PaymentLedgerUseCase::new(
            Arc::new(InMemoryStore::default()),
            Arc::new(RecordingNotifier::default()),
        ));
        let sweeper = ReconcileSweeperUseCase::new(Arc::new(provider), ledger, 24, 100);

        let err = sweeper.sweep(now()).await.unwrap_err();
        assert!(matches!(err, EntitlementError::ProviderUnavailable(_)));
    }
}
