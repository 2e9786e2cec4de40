pub mod invoice_statuses;
pub mod payment_sources;
pub mod quota_refund_policies;
