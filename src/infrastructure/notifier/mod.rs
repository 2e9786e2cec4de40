pub mod log_notifier;
pub mod relay_notifier;
