pub mod access_attempts;
pub mod batch;
pub mod denylist;
pub mod invoices;
pub mod payments;
pub mod service_meta;
pub mod users;
