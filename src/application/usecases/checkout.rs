use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::{
    boot_epoch_gate::BootEpochGateUseCase,
    entitlement_errors::{EntitlementError, UseCaseResult},
};
use crate::domain::{
    entities::invoices::InsertInvoiceEntity,
    repositories::{invoices::InvoiceRepository, payment_provider::PaymentProviderClient},
    value_objects::{
        enums::invoice_statuses::InvoiceStatus,
        payment_payloads::PaymentPayload,
        plans::Plan,
        provider_invoices::CreateInvoiceRequest,
    },
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckoutDto {
    pub invoice_id: String,
    pub pay_url: String,
    pub payload: String,
    pub plan: String,
    pub amount: String,
    pub asset: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub asset: String,
    pub invoice_ttl_seconds: u64,
}

pub struct CheckoutUseCase {
    gate: Arc<BootEpochGateUseCase>,
    provider: Arc<dyn PaymentProviderClient + Send + Sync>,
    invoice_repo: Arc<dyn InvoiceRepository + Send + Sync>,
    settings: CheckoutSettings,
}

impl CheckoutUseCase {
    pub fn new(
        gate: Arc<BootEpochGateUseCase>,
        provider: Arc<dyn PaymentProviderClient + Send + Sync>,
        invoice_repo: Arc<dyn InvoiceRepository + Send + Sync>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            gate,
            provider,
            invoice_repo,
            settings,
        }
    }

    pub async fn create_checkout(
        &self,
        user_id: i64,
        plan_name: &str,
        now: DateTime<Utc>,
    ) -> UseCaseResult<CheckoutDto> {
        let plan = plan_name
            .trim()
            .parse::<Plan>()
            .map_err(|_| EntitlementError::UnknownPlan(plan_name.to_string()))?;
        self.gate.ensure_active(user_id, now).await?;

        let payload = PaymentPayload::for_invoice(user_id, plan, now).to_string();
        let amount = plan.price().to_string();

        let created = self
            .provider
            .create_invoice(CreateInvoiceRequest {
                asset: self.settings.asset.clone(),
                amount: amount.clone(),
                description: format!("Subscription: {}", plan.title()),
                payload: payload.clone(),
                expires_in: self.settings.invoice_ttl_seconds,
            })
            .await
            .map_err(|err| {
                error!(%user_id, plan = %plan.as_str(), error = ?err, "checkout: provider refused invoice");
                EntitlementError::ProviderUnavailable(err)
            })?;

        // The reconcile sweep still credits the payment if this bookkeeping row is missing.
        if let Err(err) = self
            .invoice_repo
            .record_pending(InsertInvoiceEntity {
                invoice_id: created.invoice_id.clone(),
                payload: payload.clone(),
                user_id,
                plan: plan.as_str().to_string(),
                amount: amount.clone(),
                asset: self.settings.asset.clone(),
                status: InvoiceStatus::Pending.to_string(),
                created_at: now,
            })
            .await
        {
            warn!(%user_id, invoice_id = %created.invoice_id, db_error = ?err, "checkout: failed to record pending invoice");
        }

        info!(%user_id, plan = %plan.as_str(), invoice_id = %created.invoice_id, "checkout: invoice created");

        Ok(CheckoutDto {
            invoice_id: created.invoice_id,
            pay_url: created.pay_url,
            payload,
            plan: plan.as_str().to_string(),
            amount,
            asset: self.settings.asset.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::usecases::testing::{InMemoryStore, RecordingNotifier},
        domain::{
            entities::users::UserEntitlementEntity,
            repositories::{
                invoices::MockInvoiceRepository, payment_provider::MockPaymentProviderClient,
            },
            value_objects::{boot_epoch::BootEpoch, provider_invoices::CreatedInvoice},
        },
    };
    use anyhow::anyhow;
    use chrono::TimeZone;
    use mockall::predicate;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn acknowledged_gate(user_id: i64, notifier: Arc<RecordingNotifier>) -> Arc<BootEpochGateUseCase> {
        let epoch = BootEpoch::new(Utc.timestamp_opt(1_699_990_000, 0).unwrap());
        let mut user = UserEntitlementEntity::new_default(user_id, now());
        user.boot_acknowledged_at = epoch.as_datetime();
        let store = Arc::new(InMemoryStore::with_users(vec![user]));
        Arc::new(BootEpochGateUseCase::new(store, notifier, epoch))
    }

    fn settings() -> CheckoutSettings {
        CheckoutSettings {
            asset: "USDT".to_string(),
            invoice_ttl_seconds: 1800,
        }
    }

    #[tokio::test]
    async fn creates_invoice_and_records_it_pending() {
        let mut provider = MockPaymentProviderClient::new();
        provider
            .expect_create_invoice()
            .with(predicate::function(|request: &CreateInvoiceRequest| {
                request.payload.starts_with("pay_42_quarter_1700000000000-")
                    && request.amount == "120"
                    && request.asset == "USDT"
                    && request.expires_in == 1800
            }))
            .times(1)
            .returning(|_| {
                Ok(CreatedInvoice {
                    invoice_id: "9001".to_string(),
                    pay_url: "https://t.me/CryptoBot?start=IV9001".to_string(),
                })
            });

        let mut invoices = MockInvoiceRepository::new();
        invoices
            .expect_record_pending()
            .withf(|invoice| invoice.invoice_id == "9001" && invoice.status == "pending")
            .times(1)
            .returning(|_| Ok(()));

        let usecase = CheckoutUseCase::new(
            acknowledged_gate(42, Arc::new(RecordingNotifier::default())),
            Arc::new(provider),
            Arc::new(invoices),
            settings(),
        );

        let checkout = usecase.create_checkout(42, "quarter", now()).await.unwrap();
        assert_eq!(checkout.invoice_id, "9001");
        assert!(checkout.payload.starts_with("pay_42_quarter_1700000000000-"));
        assert_eq!(checkout.amount, "120");
    }

    #[tokio::test]
    async fn double_submission_in_one_second_gets_two_payloads() {
        let mut provider = MockPaymentProviderClient::new();
        let mut next_id = 0;
        provider.expect_create_invoice().times(2).returning(move |_| {
            next_id += 1;
            Ok(CreatedInvoice {
                invoice_id: next_id.to_string(),
                pay_url: "https://pay".to_string(),
            })
        });
        let mut invoices = MockInvoiceRepository::new();
        invoices.expect_record_pending().times(2).returning(|_| Ok(()));

        let usecase = CheckoutUseCase::new(
            acknowledged_gate(42, Arc::new(RecordingNotifier::default())),
            Arc::new(provider),
            Arc::new(invoices),
            settings(),
        );

        let first = usecase.create_checkout(42, "month", now()).await.unwrap();
        let second = usecase.create_checkout(42, "month", now()).await.unwrap();

        assert_ne!(first.payload, second.payload);
        assert!(PaymentPayload::parse(&second.payload).is_ok());
    }

    #[tokio::test]
    async fn unknown_plan_never_reaches_the_provider() {
        let mut provider = MockPaymentProviderClient::new();
        provider.expect_create_invoice().never();

        let usecase = CheckoutUseCase::new(
            acknowledged_gate(42, Arc::new(RecordingNotifier::default())),
            Arc::new(provider),
            Arc::new(MockInvoiceRepository::new()),
            settings(),
        );

        let result = usecase.create_checkout(42, "weekly", now()).await;
        assert!(matches!(result, Err(EntitlementError::UnknownPlan(plan)) if plan == "weekly"));
    }

    #[tokio::test]
    async fn stale_user_is_asked_to_reactivate() {
        let notifier = Arc::new(RecordingNotifier::default());
        let store = Arc::new(InMemoryStore::default());
        let gate = Arc::new(BootEpochGateUseCase::new(
            store,
            notifier.clone(),
            BootEpoch::new(now()),
        ));
        let mut provider = MockPaymentProviderClient::new();
        provider.expect_create_invoice().never();

        let usecase = CheckoutUseCase::new(
            gate,
            Arc::new(provider),
            Arc::new(MockInvoiceRepository::new()),
            settings(),
        );

        let result = usecase.create_checkout(7, "month", now()).await;
        assert!(matches!(result, Err(EntitlementError::ReactivationRequired)));
        assert_eq!(*notifier.reactivations.lock().unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn provider_failure_maps_to_unavailable_and_record_failure_is_tolerated() {
        let mut failing = MockPaymentProviderClient::new();
        failing
            .expect_create_invoice()
            .returning(|_| Err(anyhow!("timed out")));
        let usecase = CheckoutUseCase::new(
            acknowledged_gate(42, Arc::new(RecordingNotifier::default())),
            Arc::new(failing),
            Arc::new(MockInvoiceRepository::new()),
            settings(),
        );
        assert!(matches!(
            usecase.create_checkout(42, "month", now()).await,
            Err(EntitlementError::ProviderUnavailable(_))
        ));

        let mut provider = MockPaymentProviderClient::new();
        provider.expect_create_invoice().returning(|_| {
            Ok(CreatedInvoice {
                invoice_id: "1".to_string(),
                pay_url: "https://pay".to_string(),
            })
        });
        let mut invoices = MockInvoiceRepository::new();
        invoices
            .expect_record_pending()
            .returning(|_| Err(anyhow!("connection refused")));
        let usecase = CheckoutUseCase::new(
            acknowledged_gate(42, Arc::new(RecordingNotifier::default())),
            Arc::new(provider),
            Arc::new(invoices),
            settings(),
        );
        assert_eq!(
            usecase.create_checkout(42, "month", now()).await.unwrap().invoice_id,
            "1"
        );
    }
}
