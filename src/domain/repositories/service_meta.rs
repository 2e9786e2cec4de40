use anyhow::Result;
use async_trait::async_trait;

use crate::domain::value_objects::boot_epoch::BootEpoch;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceMetaRepository {
    /// Persists an epoch strictly later than the stored one, starting from `candidate`,
    /// and returns what was stored.
    async fn claim_boot_epoch(&self, candidate: BootEpoch) -> Result<BootEpoch>;
}
