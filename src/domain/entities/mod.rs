pub mod access_attempts;
pub mod invoices;
pub mod payments;
pub mod users;
