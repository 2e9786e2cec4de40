use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;

use super::users::{lock_or_create, save};
use crate::{
    domain::{
        entities::payments::{InsertPaymentEntity, PaymentEntity},
        repositories::payments::PaymentLedgerRepository,
        value_objects::{
            enums::invoice_statuses::InvoiceStatus, ledger::LedgerOutcome, plans::PlanEffect,
        },
    },
    infrastructure::postgres::{
        pg_writer::PgWriter,
        schema::{invoices, payments},
    },
};

pub struct PaymentLedgerPostgres {
    writer: Arc<PgWriter>,
}

impl PaymentLedgerPostgres {
    pub fn new(writer: Arc<PgWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl PaymentLedgerRepository for PaymentLedgerPostgres {
    async fn apply_payment(&self, payment: InsertPaymentEntity, effect: PlanEffect) -> Result<LedgerOutcome> {
        self.writer
            .execute(move |conn| {
                let outcome = conn.transaction::<_, anyhow::Error, _>(|conn| {
                    // The primary key on payload is the only duplicate gate.
                    let inserted = diesel::insert_into(payments::table)
                        .values(&payment)
                        .on_conflict(payments::payload)
                        .do_nothing()
                        .execute(conn)?;

                    if inserted == 0 {
                        return Ok(LedgerOutcome::AlreadyApplied);
                    }

                    let now = payment.processed_at;
                    let mut user = lock_or_create(conn, payment.user_id, now)?;
                    effect.apply(&mut user, now);
                    let user = save(conn, &user, now)?;

                    diesel::update(invoices::table.filter(invoices::payload.eq(&payment.payload)))
                        .set(invoices::status.eq(InvoiceStatus::Paid.as_str()))
                        .execute(conn)?;

                    Ok(LedgerOutcome::Applied { user })
                })?;
                Ok(outcome)
            })
            .await
    }

    async fn find_by_payload(&self, payload: String) -> Result<Option<PaymentEntity>> {
        self.writer
            .execute(move |conn| {
                let payment = payments::table
                    .find(payload)
                    .select(PaymentEntity::as_select())
                    .first::<PaymentEntity>(conn)
                    .optional()?;
                Ok(payment)
            })
            .await
    }
}
