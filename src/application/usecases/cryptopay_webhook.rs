use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
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
        provider_invoices::ProviderInvoice,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAck {
    Applied,
    AlreadyApplied,
    Ignored,
    FailedInternally,
}

pub struct CryptoPayWebhookUseCase {
    ledger: Arc<PaymentLedgerUseCase>,
    provider: Arc<dyn PaymentProviderClient + Send + Sync>,
    verify_signature: bool,
}

impl CryptoPayWebhookUseCase {
    pub fn new(
        ledger: Arc<PaymentLedgerUseCase>,
        provider: Arc<dyn PaymentProviderClient + Send + Sync>,
        verify_signature: bool,
    ) -> Self {
        Self {
            ledger,
            provider,
            verify_signature,
        }
    }

    /// Only a bad signature or an unparseable body is an error. Anything else is
    /// acknowledged so the provider stops retrying; ledger failures are logged and left
    /// for the next reconcile sweep.
    pub async fn handle(&self, body: &[u8], signature: Option<&str>) -> UseCaseResult<WebhookAck> {
        if self.verify_signature {
            let signature = signature.ok_or(EntitlementError::InvalidSignature)?;
            if let Err(err) = self.provider.verify_webhook_signature(body, signature) {
                warn!(error = %err, "cryptopay_webhook: signature rejected");
                return Err(EntitlementError::InvalidSignature);
            }
        }

        let json: Value = serde_json::from_slice(body).map_err(|err| {
            warn!(parse_error = %err, "cryptopay_webhook: body is not json");
            EntitlementError::MalformedBody
        })?;

        let Some(invoice) = ProviderInvoice::from_webhook_body(&json) else {
            info!("cryptopay_webhook: no invoice in body, ignoring");
            return Ok(WebhookAck::Ignored);
        };

        if invoice.status != InvoiceStatus::Paid {
            info!(
                invoice_id = ?invoice.invoice_id,
                status = %invoice.status,
                "cryptopay_webhook: invoice not paid, ignoring"
            );
            return Ok(WebhookAck::Ignored);
        }

        let Some(raw_payload) = invoice.payload.as_deref() else {
            warn!(invoice_id = ?invoice.invoice_id, "cryptopay_webhook: paid invoice without payload");
            return Ok(WebhookAck::Ignored);
        };

        let payload = match PaymentPayload::parse(raw_payload) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(payload = %raw_payload, error = %err, "cryptopay_webhook: unrecognised payload");
                return Ok(WebhookAck::Ignored);
            }
        };

        let paid_at = invoice.paid_at.unwrap_or_else(Utc::now);
        match self.ledger.credit(&payload, paid_at, PaymentSource::Webhook).await {
            Ok(LedgerOutcome::Applied { .. }) => Ok(WebhookAck::Applied),
            Ok(LedgerOutcome::AlreadyApplied) => Ok(WebhookAck::AlreadyApplied),
            Err(err) => {
                error!(payload = %raw_payload, error = ?err, "cryptopay_webhook: credit failed");
                Ok(WebhookAck::FailedInternally)
            }
        }
    }
}
