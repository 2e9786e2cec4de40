pub mod access;
pub mod attempts;
pub mod batch_jobs;
pub mod boot_epoch;
pub mod entitlement_mutations;
pub mod entitlements;
pub mod enums;
pub mod flood_guard;
pub mod ledger;
pub mod payment_payloads;
pub mod plans;
pub mod provider_invoices;
pub mod query_values;
