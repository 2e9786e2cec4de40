use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::error;

use crate::domain::{
    repositories::payment_provider::PaymentProviderClient,
    value_objects::provider_invoices::{CreateInvoiceRequest, CreatedInvoice, ProviderInvoice},
};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_HEADER: &str = "Crypto-Pay-API-Token";

/// Minimal Crypto Pay client built on reqwest.
pub struct CryptoPayClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct CryptoPayEnvelope<T> {
    ok: bool,
    result: Option<T>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct InvoiceList {
    #[serde(default)]
    items: Vec<Value>,
}

impl CryptoPayClient {
    pub fn new(base_url: String, api_token: String, timeout_seconds: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(1)))
            .build()
            .context("cryptopay: failed to build http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    async fn unwrap_envelope<T: DeserializeOwned>(resp: reqwest::Response, context: &str) -> Result<T> {
        let status = resp.status();
        let body = resp.text().await?;

        let envelope = match serde_json::from_str::<CryptoPayEnvelope<T>>(&body) {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(status = %status, context = %context, parse_error = %err, "cryptopay: unreadable response");
                bail!("Crypto Pay request failed: {} (status {})", context, status);
            }
        };

        match (envelope.ok, envelope.result) {
            (true, Some(result)) if status.is_success() => Ok(result),
            _ => {
                error!(
                    status = %status,
                    context = %context,
                    cryptopay_error = ?envelope.error,
                    "cryptopay: api request failed"
                );
                bail!("Crypto Pay request failed: {} (status {})", context, status)
            }
        }
    }
}

/// Expected `crypto-pay-api-signature` for a raw webhook body:
/// hex(HMAC-SHA256(key = SHA256(token), body)).
pub fn webhook_signature(api_token: &str, body: &[u8]) -> Result<String> {
    let mac = signed_body(api_token, body)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn signed_body(api_token: &str, body: &[u8]) -> Result<HmacSha256> {
    let key = Sha256::digest(api_token.as_bytes());
    let mut mac = HmacSha256::new_from_slice(&key)?;
    mac.update(body);
    Ok(mac)
}

#[async_trait]
impl PaymentProviderClient for CryptoPayClient {
    async fn create_invoice(&self, request: CreateInvoiceRequest) -> Result<CreatedInvoice> {
        let body = json!({
            "asset": request.asset,
            "amount": request.amount,
            "description": request.description,
            "payload": request.payload,
            "allow_comments": false,
            "allow_anonymous": true,
            "expires_in": request.expires_in,
        });

        let resp = self
            .http
            .post(format!("{}/createInvoice", self.base_url))
            .header(TOKEN_HEADER, &self.api_token)
            .json(&body)
            .send()
            .await?;
        let invoice: Value = Self::unwrap_envelope(resp, "create invoice").await?;

        let invoice_id = invoice
            .get("invoice_id")
            .or_else(|| invoice.get("id"))
            .and_then(|id| match id {
                Value::Number(n) => Some(n.to_string()),
                Value::String(s) => Some(s.clone()),
                _ => None,
            })
            .ok_or_else(|| anyhow!("Crypto Pay invoice without id"))?;
        let pay_url = ["bot_invoice_url", "pay_url", "mini_app_invoice_url", "web_app_invoice_url"]
            .iter()
            .find_map(|key| invoice.get(*key).and_then(Value::as_str))
            .ok_or_else(|| anyhow!("Crypto Pay invoice without pay url"))?
            .to_string();

        Ok(CreatedInvoice { invoice_id, pay_url })
    }

    async fn get_paid_invoices(&self, count: u32) -> Result<Vec<ProviderInvoice>> {
        let resp = self
            .http
            .get(format!("{}/getInvoices", self.base_url))
            .header(TOKEN_HEADER, &self.api_token)
            .query(&[("status", "paid".to_string()), ("count", count.to_string())])
            .send()
            .await?;
        let list: InvoiceList = Self::unwrap_envelope(resp, "get invoices").await?;

        Ok(list.items.iter().filter_map(ProviderInvoice::from_json).collect())
    }

    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> Result<()> {
        let mac = signed_body(&self.api_token, body)?;
        let provided = hex::decode(signature.trim()).context("signature is not hex")?;
        mac.verify_slice(&provided)
            .map_err(|_| anyhow!("invalid webhook signature"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CryptoPayClient {
        CryptoPayClient::new("https://pay.crypt.bot/api/".to_string(), "1234:AAtoken".to_string(), 10).unwrap()
    }

    #[test]
    fn accepts_matching_signature() {
        let body = br#"{"update_id":1,"update_type":"invoice_paid"}"#;
        let signature = webhook_signature("1234:AAtoken", body).unwrap();

        assert!(client().verify_webhook_signature(body, &signature).is_ok());
    }

    #[test]
    fn rejects_tampered_body_or_bad_hex() {
        let body = br#"{"update_id":1}"#;
        let signature = webhook_signature("1234:AAtoken", body).unwrap();

        assert!(client().verify_webhook_signature(br#"{"update_id":2}"#, &signature).is_err());
        assert!(client().verify_webhook_signature(body, "not-hex").is_err());
        assert!(client().verify_webhook_signature(body, "").is_err());
    }

    #[test]
    fn signature_is_keyed_by_token_hash() {
        let body = b"{}";
        assert_ne!(
            webhook_signature("token-a", body).unwrap(),
            webhook_signature("token-b", body).unwrap()
        );
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(client().base_url, "https://pay.crypt.bot/api");
    }
}
