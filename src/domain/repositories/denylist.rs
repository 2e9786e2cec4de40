use anyhow::Result;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DenylistRepository {
    async fn contains_any(&self, values: Vec<String>) -> Result<bool>;

    /// Returns how many values were new.
    async fn add_values(&self, values: Vec<String>) -> Result<usize>;

    /// Returns how many values were present.
    async fn remove_values(&self, values: Vec<String>) -> Result<usize>;
}
