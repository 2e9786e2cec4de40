use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    entities::access_attempts::AccessAttemptEntity, value_objects::attempts::AttemptOutcome,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessAttemptRepository {
    /// Records the outcome of an attempt of `user_id`. Returns false when the attempt is
    /// unknown or already finished.
    async fn finish(
        &self,
        user_id: i64,
        attempt_id: Uuid,
        outcome: AttemptOutcome,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Zero-based page, newest first, plus the total row count.
    async fn list_page(&self, page: i64, page_size: i64) -> Result<(Vec<AccessAttemptEntity>, i64)>;
}
