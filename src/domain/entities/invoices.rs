use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infrastructure::postgres::schema::invoices;

/// Pending-attempt bookkeeping for invoices created at checkout. The ledger flips the
/// status to `paid` in the same transaction that applies the payment.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = invoices)]
#[diesel(primary_key(invoice_id))]
pub struct InvoiceEntity {
    pub invoice_id: String,
    pub payload: String,
    pub user_id: i64,
    pub plan: String,
    pub amount: String,
    pub asset: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = invoices)]
pub struct InsertInvoiceEntity {
    pub invoice_id: String,
    pub payload: String,
    pub user_id: i64,
    pub plan: String,
    pub amount: String,
    pub asset: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
