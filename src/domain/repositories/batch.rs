use anyhow::Result;
use async_trait::async_trait;

use crate::domain::value_objects::batch_jobs::BatchMutation;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BatchMutationRepository {
    async fn list_user_ids(&self) -> Result<Vec<i64>>;

    /// Applies `mutation` to the given ids in one short transaction and returns the number
    /// of rows that actually changed.
    async fn apply_chunk(&self, user_ids: Vec<i64>, mutation: BatchMutation) -> Result<usize>;
}
