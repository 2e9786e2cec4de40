pub mod access_attempts;
pub mod batch;
pub mod denylist;
pub mod invoices;
pub mod notifier;
pub mod payment_provider;
pub mod payments;
pub mod service_meta;
pub mod users;
