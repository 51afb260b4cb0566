//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: endpoint assumed down, calls fail fast
//! - Half-Open: testing if endpoint recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure rate >= threshold over the rolling window
//! Open → Half-Open: first call after the reset timeout
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails (cool-down restarts)
//! ```
//!
//! # Design Decisions
//! - Per-endpoint circuit breaker (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - Single trial in Half-Open (prevents hammering recovering endpoint)
//! - Transitions serialized by a per-endpoint mutex; the lock is never held
//!   across an await, callers hold a `BreakerPermit` instead

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::load_balancer::endpoint::Endpoint;
use crate::observability::metrics;

/// Breaker state tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

/// Point-in-time view of a breaker, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub failure_count: u32,
    pub last_failure: Option<Instant>,
    pub last_transition: Instant,
}

/// Call was short-circuited because the breaker is open (or a half-open
/// trial is already in flight).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected;

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    /// Outcomes inside the rolling window; `true` marks a failure.
    window: VecDeque<(Instant, bool)>,
    failure_count: u32,
    last_failure: Option<Instant>,
    last_transition: Instant,
    trial_in_flight: bool,
}

impl Inner {
    fn prune(&mut self, now: Instant, span: std::time::Duration) {
        while let Some(&(at, failed)) = self.window.front() {
            if now.duration_since(at) < span {
                break;
            }
            self.window.pop_front();
            if failed {
                self.failure_count = self.failure_count.saturating_sub(1);
            }
        }
    }

    fn reset_window(&mut self) {
        self.window.clear();
        self.failure_count = 0;
    }
}

/// Failure-rate tracker guarding one endpoint.
#[derive(Debug)]
pub struct CircuitBreaker {
    endpoint: Endpoint,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(endpoint: Endpoint, config: CircuitBreakerConfig) -> Self {
        Self {
            endpoint,
            config,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                window: VecDeque::new(),
                failure_count: 0,
                last_failure: None,
                last_transition: Instant::now(),
                trial_in_flight: false,
            }),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave Inner half-updated in a
        // way that matters more than losing the breaker, so recover the guard.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ask permission to contact the endpoint.
    ///
    /// Returns `Err(Rejected)` while open (before the cool-down elapses) and
    /// while a half-open trial is outstanding.
    pub fn try_acquire(self: &Arc<Self>) -> Result<BreakerPermit, Rejected> {
        let now = Instant::now();
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => Ok(BreakerPermit::new(self.clone(), false)),
            BreakerState::Open => {
                if now.duration_since(inner.last_transition) < self.config.reset_timeout() {
                    return Err(Rejected);
                }
                self.transition(&mut inner, BreakerState::HalfOpen, now);
                inner.trial_in_flight = true;
                Ok(BreakerPermit::new(self.clone(), true))
            }
            BreakerState::HalfOpen => {
                if inner.trial_in_flight {
                    return Err(Rejected);
                }
                inner.trial_in_flight = true;
                Ok(BreakerPermit::new(self.clone(), true))
            }
        }
    }

    /// Current state without side effects.
    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            last_failure: inner.last_failure,
            last_transition: inner.last_transition,
        }
    }

    fn record(&self, trial: bool, failed: bool) {
        let now = Instant::now();
        let mut inner = self.lock();
        if failed {
            inner.last_failure = Some(now);
        }

        if trial {
            inner.trial_in_flight = false;
            if failed {
                // Back to open; the cool-down restarts from now.
                self.transition(&mut inner, BreakerState::Open, now);
            } else {
                inner.reset_window();
                self.transition(&mut inner, BreakerState::Closed, now);
            }
            return;
        }

        // Outcome of a call admitted while closed that finished after the
        // breaker already tripped: the transition has happened once.
        if inner.state != BreakerState::Closed {
            return;
        }

        inner.prune(now, self.config.rolling_window());
        inner.window.push_back((now, failed));
        if failed {
            inner.failure_count += 1;
        }

        if failed && self.threshold_reached(&inner) {
            self.transition(&mut inner, BreakerState::Open, now);
        }
    }

    fn threshold_reached(&self, inner: &Inner) -> bool {
        let calls = inner.window.len() as u64;
        if calls == 0 || calls < u64::from(self.config.volume_threshold) {
            return false;
        }
        let failures = u64::from(inner.failure_count);
        failures * 100 >= u64::from(self.config.error_threshold_percentage) * calls
    }

    fn release_trial(&self) {
        self.lock().trial_in_flight = false;
    }

    fn transition(&self, inner: &mut Inner, to: BreakerState, now: Instant) {
        let from = inner.state;
        inner.state = to;
        inner.last_transition = now;
        if from == to {
            return;
        }
        match to {
            BreakerState::Open => tracing::warn!(
                endpoint = %self.endpoint,
                from = from.as_str(),
                failures = inner.failure_count,
                "Circuit opened"
            ),
            _ => tracing::info!(
                endpoint = %self.endpoint,
                from = from.as_str(),
                to = to.as_str(),
                "Circuit state changed"
            ),
        }
        metrics::record_breaker_transition(&self.endpoint, to);
    }
}

/// Admission to one guarded call.
///
/// Report the outcome with [`BreakerPermit::success`] or
/// [`BreakerPermit::failure`]. Dropping the permit without reporting (e.g. the
/// request was cancelled) records nothing, but frees a half-open trial slot.
#[derive(Debug)]
pub struct BreakerPermit {
    breaker: Arc<CircuitBreaker>,
    trial: bool,
    reported: bool,
}

impl BreakerPermit {
    fn new(breaker: Arc<CircuitBreaker>, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            reported: false,
        }
    }

    /// Whether this permit is the single half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn success(mut self) {
        self.reported = true;
        self.breaker.record(self.trial, false);
    }

    pub fn failure(mut self) {
        self.reported = true;
        self.breaker.record(self.trial, true);
    }

    pub fn report(self, failed: bool) {
        if failed {
            self.failure()
        } else {
            self.success()
        }
    }
}

impl Drop for BreakerPermit {
    fn drop(&mut self) {
        if self.trial && !self.reported {
            self.breaker.release_trial();
        }
    }
}

/// Lazily-populated breakers keyed by endpoint.
#[derive(Debug)]
pub struct BreakerRegistry {
    breakers: DashMap<Endpoint, Arc<CircuitBreaker>>,
    config: CircuitBreakerConfig,
}

impl BreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            config,
        }
    }

    /// Breaker for `endpoint`, created closed on first reference.
    pub fn get(&self, endpoint: &Endpoint) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(endpoint) {
            return existing.value().clone();
        }
        self.breakers
            .entry(endpoint.clone())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(endpoint.clone(), self.config.clone())))
            .value()
            .clone()
    }

    /// State of `endpoint`'s breaker; endpoints never referenced are closed.
    pub fn state_of(&self, endpoint: &Endpoint) -> BreakerState {
        self.breakers
            .get(endpoint)
            .map(|b| b.state())
            .unwrap_or(BreakerState::Closed)
    }

    /// Drop breakers for endpoints that are no longer registered.
    pub fn retain_known(&self, known: &HashSet<Endpoint>) {
        let before = self.breakers.len();
        self.breakers.retain(|endpoint, _| known.contains(endpoint));
        let dropped = before.saturating_sub(self.breakers.len());
        if dropped > 0 {
            tracing::debug!(dropped, "Dropped breaker state for deregistered endpoints");
        }
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
