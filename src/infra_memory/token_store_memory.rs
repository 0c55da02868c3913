use crate::domain_port::{StoreError, TokenStore};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Process-local token store for the `memory` backend and for tests. Expiry
/// is checked lazily on read; there is no background sweeper.
#[derive(Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries()
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete_round_trip() {
        let store = MemoryTokenStore::new();
        store.set("refreshToken:alice", "tok", 60).await.unwrap();
        assert_eq!(
            store.get("refreshToken:alice").await.unwrap().as_deref(),
            Some("tok")
        );
        store.delete("refreshToken:alice").await.unwrap();
        assert_eq!(store.get("refreshToken:alice").await.unwrap(), None);
        // Deleting an absent key is not an error.
        store.delete("refreshToken:alice").await.unwrap();
    }

    #[tokio::test]
    async fn overwrite_replaces_the_previous_value() {
        let store = MemoryTokenStore::new();
        store.set("k", "first", 60).await.unwrap();
        store.set("k", "second", 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));
    }
}
