use std::str::FromStr;

use anyhow::{Context, Result, anyhow};

use super::{
    config_model::{
        Batch, CryptoPay, Database, DotEnvyConfig, Entitlements, InternalApi, NotifierRelay,
        Reconcile, Server,
    },
    stage::Stage,
};
use crate::domain::value_objects::{
    enums::quota_refund_policies::QuotaRefundPolicy,
    flood_guard::{DEFAULT_HISTORY_CAPACITY, FloodPolicy},
};

/// Webhook bodies are HMAC-checked unless an operator opts out.
pub const VERIFY_SIGNATURE_DEFAULT: bool = true;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: required("SERVER_PORT")?
            .parse()
            .context("SERVER_PORT is invalid")?,
        body_limit: parse_or("SERVER_BODY_LIMIT", 1)?,
        timeout: parse_or("SERVER_TIMEOUT", 30)?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
        connect_timeout_seconds: parse_or("DATABASE_CONNECT_TIMEOUT_SECONDS", 5)?,
        write_queue: parse_or("DATABASE_WRITE_QUEUE", 256)?,
    };

    let refund_policy = match optional("QUOTA_REFUND_POLICY") {
        Some(raw) => raw
            .parse::<QuotaRefundPolicy>()
            .map_err(|_| anyhow!("QUOTA_REFUND_POLICY is invalid"))?,
        None => QuotaRefundPolicy::default(),
    };

    let entitlements = Entitlements {
        trial_limit: parse_or("TRIAL_LIMIT", 3)?,
        flood: FloodPolicy {
            window_seconds: parse_or("FLOOD_WINDOW_SECONDS", 15)?,
            burst_limit: parse_or("FLOOD_BURST_LIMIT", 10)?,
            min_interval_seconds: parse_or("FLOOD_MIN_INTERVAL_SECONDS", 3)?,
            history_capacity: parse_or("FLOOD_HISTORY_CAPACITY", DEFAULT_HISTORY_CAPACITY)?,
        },
        refund_policy,
        auto_ack_on_boot: bool_or("AUTO_ACK_ON_BOOT", true)?,
    };

    let batch = Batch {
        chunk_size: parse_or::<usize>("BATCH_CHUNK_SIZE", 1000)?.max(1),
    };

    let reconcile = Reconcile {
        window_hours: parse_or("RECONCILE_WINDOW_HOURS", 24)?,
        page_size: parse_or("RECONCILE_PAGE_SIZE", 100)?,
        interval_seconds: optional("RECONCILE_INTERVAL_SECONDS")
            .map(|raw| raw.parse::<u64>())
            .transpose()
            .context("RECONCILE_INTERVAL_SECONDS is invalid")?
            .filter(|seconds| *seconds > 0),
    };

    let cryptopay = CryptoPay {
        api_token: required("CRYPTOPAY_API_TOKEN")?,
        base_url: optional("CRYPTOPAY_BASE_URL")
            .unwrap_or_else(|| "https://pay.crypt.bot/api".to_string())
            .trim_end_matches('/')
            .to_string(),
        asset: optional("CRYPTOPAY_ASSET").unwrap_or_else(|| "USDT".to_string()),
        invoice_ttl_seconds: parse_or("CRYPTOPAY_INVOICE_TTL_SECONDS", 1800)?,
        timeout_seconds: parse_or("CRYPTOPAY_TIMEOUT_SECONDS", 10)?,
        verify_signature: bool_or("CRYPTOPAY_VERIFY_SIGNATURE", VERIFY_SIGNATURE_DEFAULT)?,
    };

    let notifier = NotifierRelay {
        relay_url: optional("NOTIFIER_RELAY_URL"),
    };

    let internal_api = InternalApi {
        token: required("INTERNAL_API_TOKEN")?,
    };

    Ok(DotEnvyConfig {
        server,
        database,
        entitlements,
        batch,
        reconcile,
        cryptopay,
        notifier,
        internal_api,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("{} is invalid", key))
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw.parse::<T>().with_context(|| format!("{} is invalid", key)),
        None => Ok(default),
    }
}

fn bool_or(key: &str, default: bool) -> Result<bool> {
    match optional(key) {
        Some(raw) => parse_bool(&raw).with_context(|| format!("{} is invalid", key)),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_boolean_spellings() {
        assert_eq!(parse_bool("On"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn webhook_signatures_are_verified_when_unset() {
        let verify = bool_or("ENTITLEMENT_GATE_TEST_UNSET_VERIFY_FLAG", VERIFY_SIGNATURE_DEFAULT).unwrap();

        assert!(verify);
    }

    #[test]
    fn unknown_stage_falls_back_to_local() {
        assert_eq!(Stage::try_from("prod").unwrap(), Stage::Production);
        assert_eq!(Stage::try_from("").unwrap_or_default(), Stage::Local);
    }
}
