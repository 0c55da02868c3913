/// Failure of a raw store call: connection errors, command errors, timeouts.
/// A missing key is not a failure; it is `Ok(None)` on `get`.
#[derive(Debug, thiserror::Error)]
#[error("token store error: {0}")]
pub struct StoreError(pub String);

/// Raw access to the shared external TTL key-value store. Implementations do
/// not retry and do not hide failures; the resilience gateway in front of
/// this port owns that policy.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
