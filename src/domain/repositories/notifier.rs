use anyhow::Result;
use async_trait::async_trait;

/// Outbound messages to the chat front-end. Every caller treats failures as best-effort.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier {
    async fn send(&self, user_id: i64, text: String) -> Result<()>;

    async fn request_reactivation(&self, user_id: i64) -> Result<()>;

    async fn report_progress(&self, handle: String, text: String) -> Result<()>;
}
