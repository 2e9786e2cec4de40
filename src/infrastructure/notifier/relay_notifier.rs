use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use url::Url;

use crate::domain::repositories::notifier::Notifier;

/// Forwards notifications to the chat front-end's relay endpoint as JSON.
pub struct RelayNotifier {
    relay_url: Url,
    client: Client,
}

impl RelayNotifier {
    pub fn new(relay_url: &str) -> Result<Self> {
        let relay_url = Url::parse(relay_url).context("NOTIFIER_RELAY_URL is invalid")?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(3))
            .build()
            .context("notifier: failed to build http client")?;

        Ok(Self { relay_url, client })
    }

    async fn post(&self, body: Value) -> Result<()> {
        let response = self
            .client
            .post(self.relay_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(sanitize_reqwest_error)?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "notifier relay returned non-success status: {}",
            response.status()
        ))
    }
}

#[async_trait]
impl Notifier for RelayNotifier {
    async fn send(&self, user_id: i64, text: String) -> Result<()> {
        self.post(json!({ "kind": "message", "user_id": user_id, "text": text }))
            .await
    }

    async fn request_reactivation(&self, user_id: i64) -> Result<()> {
        self.post(json!({ "kind": "reactivation_request", "user_id": user_id }))
            .await
    }

    async fn report_progress(&self, handle: String, text: String) -> Result<()> {
        self.post(json!({ "kind": "progress", "handle": handle, "text": text }))
            .await
    }
}

fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("notifier relay request timed out");
    }
    if error.is_connect() {
        return anyhow!("notifier relay connection failed");
    }
    anyhow!("notifier relay request failed")
}
