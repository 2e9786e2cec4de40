use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;

use crate::{
    domain::{entities::invoices::InsertInvoiceEntity, repositories::invoices::InvoiceRepository},
    infrastructure::postgres::{pg_writer::PgWriter, schema::invoices},
};

pub struct InvoicePostgres {
    writer: Arc<PgWriter>,
}

impl InvoicePostgres {
    pub fn new(writer: Arc<PgWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl InvoiceRepository for InvoicePostgres {
    async fn record_pending(&self, invoice: InsertInvoiceEntity) -> Result<()> {
        self.writer
            .execute(move |conn| {
                diesel::insert_into(invoices::table)
                    .values(&invoice)
                    .on_conflict(invoices::invoice_id)
                    .do_nothing()
                    .execute(conn)?;
                Ok(())
            })
            .await
    }
}
