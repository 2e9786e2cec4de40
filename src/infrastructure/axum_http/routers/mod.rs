pub mod admin;
pub mod cryptopay_webhook;
pub mod users;
