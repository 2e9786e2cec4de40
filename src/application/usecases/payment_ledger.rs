use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::entitlement_errors::{EntitlementError, UseCaseResult};
use crate::domain::{
    entities::{payments::InsertPaymentEntity, users::UserEntitlementEntity},
    repositories::{notifier::Notifier, payments::PaymentLedgerRepository},
    value_objects::{
        enums::payment_sources::PaymentSource,
        ledger::LedgerOutcome,
        payment_payloads::PaymentPayload,
        plans::{Plan, PlanEffect},
    },
};

/// Idempotent crediting. The unique payload row decides whether a payment was already
/// applied; everything else follows from that insert.
pub struct PaymentLedgerUseCase {
    ledger_repo: Arc<dyn PaymentLedgerRepository + Send + Sync>,
    notifier: Arc<dyn Notifier + Send + Sync>,
}

impl PaymentLedgerUseCase {
    pub fn new(
        ledger_repo: Arc<dyn PaymentLedgerRepository + Send + Sync>,
        notifier: Arc<dyn Notifier + Send + Sync>,
    ) -> Self {
        Self {
            ledger_repo,
            notifier,
        }
    }

    pub async fn credit(
        &self,
        payload: &PaymentPayload,
        paid_at: DateTime<Utc>,
        source: PaymentSource,
    ) -> UseCaseResult<LedgerOutcome> {
        let raw_payload = payload.to_string();
        let now = Utc::now();

        let payment = InsertPaymentEntity {
            payload: raw_payload.clone(),
            user_id: payload.user_id,
            plan: payload.plan.as_str().to_string(),
            source: source.as_str().to_string(),
            paid_at,
            processed_at: now,
        };

        let outcome = self
            .ledger_repo
            .apply_payment(payment, payload.plan.effect())
            .await
            .map_err(|err| {
                error!(
                    user_id = payload.user_id,
                    payload = %raw_payload,
                    db_error = ?err,
                    "payment_ledger: failed to apply payment"
                );
                EntitlementError::Internal(err)
            })?;

        match &outcome {
            LedgerOutcome::Applied { user } => {
                info!(
                    user_id = payload.user_id,
                    payload = %raw_payload,
                    plan = %payload.plan,
                    source = %source,
                    "payment_ledger: payment applied"
                );
                self.notify_applied(payload.plan, user, source).await;
            }
            LedgerOutcome::AlreadyApplied => {
                info!(
                    user_id = payload.user_id,
                    payload = %raw_payload,
                    source = %source,
                    "payment_ledger: payload already applied"
                );
            }
        }

        Ok(outcome)
    }

    async fn notify_applied(&self, plan: Plan, user: &UserEntitlementEntity, source: PaymentSource) {
        let text = applied_message(plan, user, source);
        if let Err(err) = self.notifier.send(user.id, text).await {
            warn!(user_id = user.id, error = ?err, "payment_ledger: confirmation not delivered");
        }
    }
}

fn applied_message(plan: Plan, user: &UserEntitlementEntity, source: PaymentSource) -> String {
    let headline = match source {
        PaymentSource::Admin => format!("Plan granted: {}", plan.title()),
        PaymentSource::Webhook | PaymentSource::Reconcile => {
            format!("Payment accepted: {}", plan.title())
        }
    };

    match (plan.effect(), user.subscription_expires_at) {
        (PlanEffect::ExtendSubscription { .. }, Some(expires_at)) => format!(
            "{}. Subscription active until {}.",
            headline,
            expires_at.format("%Y-%m-%d %H:%M UTC")
        ),
        (PlanEffect::HideData, _) => format!("{}. Your data is now hidden.", headline),
        _ => format!("{}.", headline),
    }
}
