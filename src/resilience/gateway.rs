use crate::domain_port::TokenStore;
use crate::logger::{debug, error};
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig};
use std::sync::Arc;
use std::time::Duration;

/// Circuit-breaker-protected front of the shared TTL key-value store.
///
/// The store is a durability aid for refresh tokens, not the source of truth
/// for an active session, so an outage must degrade to "force re-login"
/// instead of failing requests: reads fall back to `None`, writes and deletes
/// to a logged no-op. Callers never see a store failure.
pub struct TokenStoreGateway {
    inner: Arc<dyn TokenStore>,
    breaker: CircuitBreaker,
    call_timeout: Duration,
}

impl TokenStoreGateway {
    pub fn new(
        inner: Arc<dyn TokenStore>,
        breaker_name: impl Into<String>,
        config: CircuitBreakerConfig,
        call_timeout: Duration,
    ) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(breaker_name, config),
            call_timeout,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let Some(permit) = self.breaker.try_acquire() else {
            debug!(key, breaker = self.breaker.name(), "GET short-circuited");
            return None;
        };
        match tokio::time::timeout(self.call_timeout, self.inner.get(key)).await {
            Ok(Ok(value)) => {
                permit.on_success();
                value
            }
            Ok(Err(e)) => {
                permit.on_failure();
                error!(key, error = %e, "token store GET failed, falling back to absent");
                None
            }
            Err(_) => {
                permit.on_failure();
                error!(key, "token store GET timed out, falling back to absent");
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        let Some(permit) = self.breaker.try_acquire() else {
            debug!(key, breaker = self.breaker.name(), "SET short-circuited");
            return;
        };
        match tokio::time::timeout(self.call_timeout, self.inner.set(key, value, ttl_secs)).await
        {
            Ok(Ok(())) => permit.on_success(),
            Ok(Err(e)) => {
                permit.on_failure();
                error!(key, error = %e, "token store SET failed, dropping write");
            }
            Err(_) => {
                permit.on_failure();
                error!(key, "token store SET timed out, dropping write");
            }
        }
    }

    pub async fn delete(&self, key: &str) {
        let Some(permit) = self.breaker.try_acquire() else {
            debug!(key, breaker = self.breaker.name(), "DELETE short-circuited");
            return;
        };
        match tokio::time::timeout(self.call_timeout, self.inner.delete(key)).await {
            Ok(Ok(())) => permit.on_success(),
            Ok(Err(e)) => {
                permit.on_failure();
                error!(key, error = %e, "token store DELETE failed, dropping delete");
            }
            Err(_) => {
                permit.on_failure();
                error!(key, "token store DELETE timed out, dropping delete");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_port::StoreError;
    use crate::resilience::BreakerStatus;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Inner store that always errors, counting how often it was reached.
    struct FailingStore {
        calls: AtomicU64,
    }

    #[async_trait::async_trait]
    impl TokenStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError("connection refused".into()))
        }

        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError("connection refused".into()))
        }
    }

    fn failing_gateway(wait: Duration) -> (Arc<FailingStore>, TokenStoreGateway) {
        let store = Arc::new(FailingStore {
            calls: AtomicU64::new(0),
        });
        let gateway = TokenStoreGateway::new(
            store.clone(),
            "tokenStoreBreaker",
            CircuitBreakerConfig {
                failure_rate_threshold: 50.0,
                sliding_window_size: 10,
                wait_duration_in_open_state: wait,
                permitted_calls_in_half_open_state: 1,
            },
            Duration::from_millis(100),
        );
        (store, gateway)
    }

    #[tokio::test]
    async fn failures_never_reach_the_caller() {
        let (_, gateway) = failing_gateway(Duration::from_secs(60));
        assert_eq!(gateway.get("refreshToken:alice").await, None);
        gateway.set("refreshToken:alice", "tok", 60).await;
        gateway.delete("refreshToken:alice").await;
    }

    #[tokio::test]
    async fn open_breaker_stops_touching_the_store() {
        let (store, gateway) = failing_gateway(Duration::from_secs(60));
        for _ in 0..5 {
            gateway.get("k").await;
        }
        assert_eq!(gateway.breaker().status(), BreakerStatus::Open);
        assert_eq!(store.calls.load(Ordering::SeqCst), 5);

        // Short-circuited straight to the fallback, inner untouched.
        assert_eq!(gateway.get("k").await, None);
        gateway.set("k", "v", 60).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 5);
        assert_eq!(gateway.breaker().metrics().rejected, 2);
    }

    #[tokio::test]
    async fn reopens_after_a_failed_trial_call() {
        let (store, gateway) = failing_gateway(Duration::from_millis(20));
        for _ in 0..5 {
            gateway.get("k").await;
        }
        assert_eq!(gateway.breaker().status(), BreakerStatus::Open);

        tokio::time::sleep(Duration::from_millis(30)).await;
        // The wait has elapsed; the next call is a half-open trial which
        // fails and reopens the breaker.
        assert_eq!(gateway.get("k").await, None);
        assert_eq!(store.calls.load(Ordering::SeqCst), 6);
        assert_eq!(gateway.breaker().status(), BreakerStatus::Open);
    }

    #[tokio::test]
    async fn slow_store_counts_as_failure() {
        struct SlowStore;

        #[async_trait::async_trait]
        impl TokenStore for SlowStore {
            async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(None)
            }

            async fn set(&self, _k: &str, _v: &str, _ttl: u64) -> Result<(), StoreError> {
                Ok(())
            }

            async fn delete(&self, _k: &str) -> Result<(), StoreError> {
                Ok(())
            }
        }

        let gateway = TokenStoreGateway::new(
            Arc::new(SlowStore),
            "tokenStoreBreaker",
            CircuitBreakerConfig::default(),
            Duration::from_millis(10),
        );
        assert_eq!(gateway.get("k").await, None);
        assert_eq!(gateway.breaker().metrics().failures, 1);
    }

    #[tokio::test]
    async fn cancelled_trial_call_does_not_strand_the_breaker_half_open() {
        /// Errors on the first call to open the breaker, then hangs forever.
        struct FailThenHangStore {
            calls: AtomicU64,
        }

        #[async_trait::async_trait]
        impl TokenStore for FailThenHangStore {
            async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(StoreError("connection refused".into()));
                }
                std::future::pending::<()>().await;
                Ok(None)
            }

            async fn set(&self, _k: &str, _v: &str, _ttl: u64) -> Result<(), StoreError> {
                Ok(())
            }

            async fn delete(&self, _k: &str) -> Result<(), StoreError> {
                Ok(())
            }
        }

        let store = Arc::new(FailThenHangStore {
            calls: AtomicU64::new(0),
        });
        let gateway = TokenStoreGateway::new(
            store.clone(),
            "tokenStoreBreaker",
            CircuitBreakerConfig {
                failure_rate_threshold: 50.0,
                sliding_window_size: 1,
                wait_duration_in_open_state: Duration::from_millis(20),
                permitted_calls_in_half_open_state: 1,
            },
            Duration::from_millis(50),
        );

        gateway.get("k").await;
        assert_eq!(gateway.breaker().status(), BreakerStatus::Open);

        tokio::time::sleep(Duration::from_millis(30)).await;
        // A client hangs up mid-trial: the call future is dropped while the
        // store is still pending, abandoning the half-open permit.
        let abandoned = tokio::time::timeout(Duration::from_millis(10), gateway.get("k")).await;
        assert!(abandoned.is_err());
        assert_eq!(gateway.breaker().status(), BreakerStatus::HalfOpen);

        // The slot was handed back: the next call is a real trial that
        // reaches the store instead of short-circuiting forever.
        assert_eq!(gateway.get("k").await, None);
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(gateway.breaker().metrics().rejected, 0);
        assert_eq!(gateway.breaker().status(), BreakerStatus::Open);
    }
}
