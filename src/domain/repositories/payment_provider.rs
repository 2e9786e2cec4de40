use anyhow::Result;
use async_trait::async_trait;

use crate::domain::value_objects::provider_invoices::{CreateInvoiceRequest, CreatedInvoice, ProviderInvoice};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProviderClient {
    async fn create_invoice(&self, request: CreateInvoiceRequest) -> Result<CreatedInvoice>;

    async fn get_paid_invoices(&self, count: u32) -> Result<Vec<ProviderInvoice>>;

    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> Result<()>;
}
