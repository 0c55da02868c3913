use crate::logger::{info, warn};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerStatus {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for BreakerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BreakerStatus::Closed => "CLOSED",
            BreakerStatus::Open => "OPEN",
            BreakerStatus::HalfOpen => "HALF_OPEN",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failure percentage of the sliding window at which the breaker opens.
    pub failure_rate_threshold: f32,
    /// Number of most recent call outcomes the failure rate is computed over.
    pub sliding_window_size: usize,
    /// How long the breaker stays open before probing recovery.
    pub wait_duration_in_open_state: Duration,
    /// Trial calls allowed through while half-open.
    pub permitted_calls_in_half_open_state: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 50.0,
            sliding_window_size: 10,
            wait_duration_in_open_state: Duration::from_secs(10),
            permitted_calls_in_half_open_state: 3,
        }
    }
}

/// Running totals across the breaker's lifetime. Short-circuited calls are
/// counted under `rejected`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BreakerMetrics {
    pub successes: u64,
    pub failures: u64,
    pub rejected: u64,
}

struct Core {
    status: BreakerStatus,
    /// Fixed-size ring of recent outcomes; `Some(true)` is a failure.
    window: Vec<Option<bool>>,
    cursor: usize,
    opened_at: Option<Instant>,
    half_open_permits: u32,
    half_open_successes: u32,
    metrics: BreakerMetrics,
}

impl Core {
    fn record(&mut self, failure: bool) {
        self.window[self.cursor] = Some(failure);
        self.cursor = (self.cursor + 1) % self.window.len();
    }

    fn failure_count(&self) -> usize {
        self.window.iter().filter(|o| **o == Some(true)).count()
    }

    fn reset_window(&mut self) {
        self.window.fill(None);
        self.cursor = 0;
    }
}

/// A granted call slot. The holder must resolve it with `on_success` or
/// `on_failure`; a permit dropped unresolved (the call future was cancelled
/// before the dependency answered) is handed back to the breaker so a
/// half-open trial slot cannot leak and pin the breaker half-open.
#[must_use = "a permit must be resolved with on_success or on_failure"]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    resolved: bool,
}

impl BreakerPermit<'_> {
    pub fn on_success(mut self) {
        self.resolved = true;
        self.breaker.record_success();
    }

    pub fn on_failure(mut self) {
        self.resolved = true;
        self.breaker.record_failure();
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.breaker.release_permit();
        }
    }
}

/// Explicit circuit breaker state machine guarding calls to a flaky
/// dependency. Callers ask for a permit with `try_acquire`, run the call
/// without any breaker lock held, then resolve the permit with the outcome.
///
/// CLOSED -> OPEN      when failures reach `failure_rate_threshold`% of the
///                     sliding window.
/// OPEN -> HALF_OPEN   once `wait_duration_in_open_state` has elapsed.
/// HALF_OPEN -> CLOSED after `permitted_calls_in_half_open_state` successful
///                     trials; any trial failure reopens it.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    core: Mutex<Core>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let size = config.sliding_window_size.max(1);
        Self {
            name: name.into(),
            core: Mutex::new(Core {
                status: BreakerStatus::Closed,
                window: vec![None; size],
                cursor: 0,
                opened_at: None,
                half_open_permits: 0,
                half_open_successes: 0,
                metrics: BreakerMetrics::default(),
            }),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // The core only holds counters, so a poisoned lock is still usable.
    fn core(&self) -> std::sync::MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self) -> BreakerStatus {
        self.core().status
    }

    pub fn metrics(&self) -> BreakerMetrics {
        self.core().metrics
    }

    /// Whether a call may go through right now. `None` means the call must go
    /// to the fallback; `Some` is a permit the caller resolves exactly once.
    pub fn try_acquire(&self) -> Option<BreakerPermit<'_>> {
        let mut core = self.core();
        let granted = match core.status {
            BreakerStatus::Closed => true,
            BreakerStatus::Open => {
                let waited = core
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.wait_duration_in_open_state)
                    .unwrap_or(true);
                if waited {
                    self.transition(&mut core, BreakerStatus::HalfOpen);
                    core.half_open_permits = 1;
                    true
                } else {
                    core.metrics.rejected += 1;
                    false
                }
            }
            BreakerStatus::HalfOpen => {
                if core.half_open_permits < self.config.permitted_calls_in_half_open_state {
                    core.half_open_permits += 1;
                    true
                } else {
                    core.metrics.rejected += 1;
                    false
                }
            }
        };
        drop(core);

        granted.then_some(BreakerPermit {
            breaker: self,
            resolved: false,
        })
    }

    fn record_success(&self) {
        let mut core = self.core();
        core.metrics.successes += 1;
        match core.status {
            BreakerStatus::Closed => core.record(false),
            BreakerStatus::HalfOpen => {
                core.half_open_successes += 1;
                if core.half_open_successes >= self.config.permitted_calls_in_half_open_state {
                    core.reset_window();
                    self.transition(&mut core, BreakerStatus::Closed);
                }
            }
            // A late result from a call granted before the breaker opened;
            // only the counter matters.
            BreakerStatus::Open => {}
        }
    }

    fn record_failure(&self) {
        let mut core = self.core();
        core.metrics.failures += 1;
        match core.status {
            BreakerStatus::Closed => {
                core.record(true);
                let failures = core.failure_count() as f32;
                let window = core.window.len() as f32;
                if failures * 100.0 >= self.config.failure_rate_threshold * window {
                    core.opened_at = Some(Instant::now());
                    self.transition(&mut core, BreakerStatus::Open);
                }
            }
            BreakerStatus::HalfOpen => {
                core.opened_at = Some(Instant::now());
                self.transition(&mut core, BreakerStatus::Open);
            }
            BreakerStatus::Open => {}
        }
    }

    /// Return a permit whose call never resolved. Only a half-open trial slot
    /// needs handing back; closed and open states track no in-flight calls.
    fn release_permit(&self) {
        let mut core = self.core();
        if core.status == BreakerStatus::HalfOpen && core.half_open_permits > 0 {
            core.half_open_permits -= 1;
        }
    }

    fn transition(&self, core: &mut Core, to: BreakerStatus) {
        let from = core.status;
        core.status = to;
        if to == BreakerStatus::HalfOpen {
            core.half_open_permits = 0;
            core.half_open_successes = 0;
        }
        match to {
            BreakerStatus::Open => {
                warn!(breaker = %self.name, %from, %to, "circuit breaker opened")
            }
            _ => info!(breaker = %self.name, %from, %to, "circuit breaker transition"),
        }
    }
}
