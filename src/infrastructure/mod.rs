pub mod axum_http;
pub mod cryptopay;
pub mod notifier;
pub mod postgres;
