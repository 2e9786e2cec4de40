use anyhow::Result;
use async_trait::async_trait;

use crate::domain::entities::invoices::InsertInvoiceEntity;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvoiceRepository {
    async fn record_pending(&self, invoice: InsertInvoiceEntity) -> Result<()>;
}
