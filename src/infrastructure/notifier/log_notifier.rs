use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::domain::repositories::notifier::Notifier;

/// Used when no relay is configured. Messages only reach the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, user_id: i64, text: String) -> Result<()> {
        info!(%user_id, text = %text, "notifier: message");
        Ok(())
    }

    async fn request_reactivation(&self, user_id: i64) -> Result<()> {
        info!(%user_id, "notifier: reactivation requested");
        Ok(())
    }

    async fn report_progress(&self, handle: String, text: String) -> Result<()> {
        info!(handle = %handle, text = %text, "notifier: progress");
        Ok(())
    }
}
