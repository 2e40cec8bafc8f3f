//! Circuit breaker state machine.
//!
//! A [`Breaker`] wraps a fallible operation and stops invoking it once the
//! operation has failed often enough, replaying the failure that opened the
//! circuit until the open timeout has passed.
//!
//! # States
//!
//! - **Closed**: the operation runs; failures are counted
//! - **Open**: the operation does not run; the cached failure is returned
//! - **HalfOpen**: the operation runs on trial; one success closes the circuit
//!
//! # State Transitions
//!
//! ```text
//! Closed   → Open:     failure_count == failure_threshold
//! Open     → HalfOpen: first call after open_timeout (still replays the cache)
//! HalfOpen → Closed:   trial call succeeds
//! HalfOpen → Open:     retry_count == retry_threshold
//! ```
//!
//! # Concurrency
//!
//! The phase and its cached failure live in one immutable snapshot published
//! through [`ArcSwap`], so readers see either the old or the new pair, never a
//! mix. Transitions are serialized by a short mutex and only apply when the
//! snapshot generation still matches the one the caller was admitted under.
//! Both counters are packed into one atomic word. They are read without
//! locking, but every write happens under the transition lock after the
//! generation check, so a late failure from an earlier episode can neither
//! land in the current counter nor leave it past its threshold.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::builder::BreakerBuilder;
use crate::config::BreakerConfig;
use crate::state::{CircuitState, StateChangeCallback};

/// Phase of the circuit. Open owns the failure it replays.
enum Phase<E> {
    Closed,
    Open { cause: E, opened_at: Instant },
    HalfOpen,
}

impl<E> Phase<E> {
    fn state(&self) -> CircuitState {
        match self {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen => CircuitState::HalfOpen,
        }
    }
}

struct Snapshot<E> {
    /// Bumped on every transition
    generation: u64,
    phase: Phase<E>,
}

/// State a call was admitted under.
#[derive(Debug, Clone, Copy)]
struct Ticket {
    state: CircuitState,
    generation: u64,
}

enum Admission<E> {
    Execute(Ticket),
    Replay(E),
}

/// Counter values at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BreakerCounts {
    /// Failures counted in the current Closed episode
    pub failures: u32,
    /// Failures counted in the current HalfOpen episode
    pub retries: u32,
}

impl BreakerCounts {
    fn pack(self) -> u64 {
        (u64::from(self.failures) << 32) | u64::from(self.retries)
    }

    fn unpack(word: u64) -> Self {
        Self {
            failures: (word >> 32) as u32,
            retries: word as u32,
        }
    }
}

/// Thread-safe circuit breaker guarding operations that return `Result<T, E>`.
///
/// While Open, [`call`](Self::call) returns a clone of the error that opened
/// the circuit instead of running the operation, hence `E: Clone`. Wrap
/// non-clonable errors in an `Arc`.
pub struct Breaker<T, E> {
    name: String,
    config: BreakerConfig,
    snapshot: ArcSwap<Snapshot<E>>,
    /// [`BreakerCounts`] packed as `failures << 32 | retries`
    counters: AtomicU64,
    transition_lock: Mutex<()>,
    on_state_change: Option<StateChangeCallback>,
    _result: PhantomData<fn() -> T>,
}

impl<T, E> Breaker<T, E> {
    /// Create a breaker with the default configuration
    pub fn new() -> Self {
        BreakerBuilder::new().build()
    }

    /// Create a breaker from a configuration, without a state-change hook
    pub fn with_config(config: BreakerConfig) -> Self {
        BreakerBuilder::from_config(config).build()
    }

    pub(crate) fn from_parts(
        name: String,
        config: BreakerConfig,
        on_state_change: Option<StateChangeCallback>,
    ) -> Self {
        debug!(
            breaker = %name,
            failure_threshold = config.failure_threshold,
            open_timeout_ms = config.open_timeout_ms(),
            retry_threshold = config.retry_threshold,
            "Creating circuit breaker"
        );

        Self {
            name,
            config,
            snapshot: ArcSwap::from_pointee(Snapshot {
                generation: 0,
                phase: Phase::Closed,
            }),
            counters: AtomicU64::new(0),
            transition_lock: Mutex::new(()),
            on_state_change,
            _result: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Current state, as left by the most recently completed transition
    pub fn state(&self) -> CircuitState {
        self.snapshot.load().phase.state()
    }

    /// Both counters, read in one load so they always belong together
    pub fn counts(&self) -> BreakerCounts {
        BreakerCounts::unpack(self.counters.load(Ordering::Acquire))
    }

    /// Caller holds the transition lock.
    fn store_counts(&self, counts: BreakerCounts) {
        self.counters.store(counts.pack(), Ordering::Release);
    }

    /// Force the circuit back to Closed, dropping any cached failure.
    ///
    /// On a breaker that is already Closed only the counters are zeroed and
    /// no transition is reported.
    pub fn reset(&self) {
        let _guard = self.transition_lock.lock();
        let current = self.snapshot.load();
        let previous = current.phase.state();
        let generation = current.generation;
        drop(current);

        if previous == CircuitState::Closed {
            self.store_counts(BreakerCounts::default());
            debug!(breaker = %self.name, "Reset counters of closed circuit breaker");
            return;
        }

        info!(breaker = %self.name, from = %previous, "Manually resetting circuit breaker");
        self.commit(previous, generation + 1, Phase::Closed);
    }

    /// Move to `next` if no other transition happened since `expected_generation`.
    fn transition(&self, expected_generation: u64, next: Phase<E>) {
        let _guard = self.transition_lock.lock();
        let current = self.snapshot.load();
        if current.generation != expected_generation {
            return;
        }
        let previous = current.phase.state();
        drop(current);

        self.commit(previous, expected_generation + 1, next);
    }

    /// Apply a transition. Caller holds the transition lock.
    fn commit(&self, previous: CircuitState, generation: u64, next: Phase<E>) {
        let next_state = next.state();
        match next_state {
            CircuitState::Closed => self.store_counts(BreakerCounts::default()),
            CircuitState::HalfOpen => self.store_counts(BreakerCounts {
                retries: 0,
                ..self.counts()
            }),
            CircuitState::Open => {}
        }

        self.snapshot.store(Arc::new(Snapshot {
            generation,
            phase: next,
        }));

        match next_state {
            CircuitState::Open => {
                warn!(breaker = %self.name, from = %previous, "Circuit breaker opened")
            }
            CircuitState::HalfOpen => {
                info!(breaker = %self.name, from = %previous, "Circuit breaker half-open, probing")
            }
            CircuitState::Closed => {
                info!(breaker = %self.name, from = %previous, "Circuit breaker closed")
            }
        }

        if let Some(callback) = &self.on_state_change {
            callback(previous, next_state);
        }
    }
}

impl<T, E: Clone> Breaker<T, E> {
    /// Call an operation with circuit breaker protection.
    ///
    /// Closed and HalfOpen run `operation` exactly once and return its result
    /// unchanged. Open never runs it and returns the cached failure; if the
    /// open timeout has elapsed the circuit moves to HalfOpen first, and this
    /// call still returns the cached failure.
    pub fn call<F>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        match self.admit() {
            Admission::Replay(cause) => Err(cause),
            Admission::Execute(ticket) => {
                let outcome = operation();
                self.record(ticket, &outcome);
                outcome
            }
        }
    }

    /// Async counterpart of [`call`](Self::call). The breaker awaits nothing
    /// but the operation itself.
    pub async fn call_async<F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.admit() {
            Admission::Replay(cause) => Err(cause),
            Admission::Execute(ticket) => {
                let outcome = operation().await;
                self.record(ticket, &outcome);
                outcome
            }
        }
    }

    fn admit(&self) -> Admission<E> {
        let snapshot = self.snapshot.load();
        let ticket = Ticket {
            state: snapshot.phase.state(),
            generation: snapshot.generation,
        };

        let (cause, expired) = match &snapshot.phase {
            Phase::Closed | Phase::HalfOpen => return Admission::Execute(ticket),
            Phase::Open { cause, opened_at } => (
                cause.clone(),
                opened_at.elapsed() >= self.config.open_timeout,
            ),
        };
        drop(snapshot);

        if expired {
            self.transition(ticket.generation, Phase::HalfOpen);
        }
        Admission::Replay(cause)
    }

    fn record(&self, ticket: Ticket, outcome: &Result<T, E>) {
        match (ticket.state, outcome) {
            (CircuitState::Closed, Ok(_)) => {}
            (CircuitState::HalfOpen, Ok(_)) => {
                self.transition(ticket.generation, Phase::Closed);
            }
            (CircuitState::Closed | CircuitState::HalfOpen, Err(err)) => {
                self.record_failure(ticket, err);
            }
            // Open never admits a call
            (CircuitState::Open, _) => {}
        }
    }

    /// Count a failure against the episode the call was admitted under and
    /// open the circuit when the count reaches its threshold.
    ///
    /// Runs under the transition lock so no transition can slip in between
    /// the generation check and the increment.
    fn record_failure(&self, ticket: Ticket, err: &E) {
        let _guard = self.transition_lock.lock();
        if self.snapshot.load().generation != ticket.generation {
            debug!(breaker = %self.name, state = %ticket.state, "Ignoring failure from an earlier episode");
            return;
        }

        let mut counts = self.counts();
        let (count, threshold) = match ticket.state {
            CircuitState::Closed => {
                counts.failures = counts.failures.saturating_add(1);
                debug!(breaker = %self.name, failures = counts.failures, "Failure recorded");
                (counts.failures, self.config.failure_threshold)
            }
            CircuitState::HalfOpen => {
                counts.retries = counts.retries.saturating_add(1);
                debug!(breaker = %self.name, retries = counts.retries, "Half-open call failed");
                (counts.retries, self.config.retry_threshold)
            }
            CircuitState::Open => return,
        };
        self.store_counts(counts);

        if count == threshold {
            self.commit(ticket.state, ticket.generation + 1, self.opened_with(err));
        }
    }

    fn opened_with(&self, err: &E) -> Phase<E> {
        Phase::Open {
            cause: err.clone(),
            opened_at: Instant::now(),
        }
    }
}

impl<T, E> Default for Breaker<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for Breaker<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Breaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("counts", &self.counts())
            .field("config", &self.config)
            .finish()
    }
}
