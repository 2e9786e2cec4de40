use crate::domain::value_objects::{
    enums::quota_refund_policies::QuotaRefundPolicy, flood_guard::FloodPolicy,
};

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub entitlements: Entitlements,
    pub batch: Batch,
    pub reconcile: Reconcile,
    pub cryptopay: CryptoPay,
    pub notifier: NotifierRelay,
    pub internal_api: InternalApi,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
    pub write_queue: usize,
}

#[derive(Debug, Clone)]
pub struct Entitlements {
    pub trial_limit: i32,
    pub flood: FloodPolicy,
    pub refund_policy: QuotaRefundPolicy,
    pub auto_ack_on_boot: bool,
}

#[derive(Debug, Clone)]
pub struct Batch {
    pub chunk_size: usize,
}

#[derive(Debug, Clone)]
pub struct Reconcile {
    pub window_hours: i64,
    pub page_size: u32,
    pub interval_seconds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CryptoPay {
    pub api_token: String,
    pub base_url: String,
    pub asset: String,
    pub invoice_ttl_seconds: u64,
    pub timeout_seconds: u64,
    pub verify_signature: bool,
}

#[derive(Debug, Clone)]
pub struct NotifierRelay {
    pub relay_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InternalApi {
    pub token: String,
}
