pub mod access_decision;
pub mod admin;
pub mod batch_jobs;
pub mod boot_epoch_gate;
pub mod checkout;
pub mod cryptopay_webhook;
pub mod entitlement_errors;
pub mod payment_ledger;
pub mod reconcile_sweeper;
pub mod user_sessions;

#[cfg(test)]
pub mod testing;
