//! Named-option construction for [`Breaker`] and [`NoResultBreaker`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::breaker::Breaker;
use crate::config::BreakerConfig;
use crate::error::Result;
use crate::no_result::NoResultBreaker;
use crate::state::{CircuitState, StateChangeCallback};

/// Name given to breakers built without an explicit one.
pub const DEFAULT_NAME: &str = "circuit-breaker";

/// Builder for circuit breakers
///
/// Every option left unset keeps its default from [`BreakerConfig::default`]:
/// open on the first failure, stay open for one minute, re-open on the first
/// failed trial call, no state-change hook.
///
/// ```
/// use cbreaker_core::{Breaker, BreakerBuilder, CircuitState};
/// use std::time::Duration;
///
/// let breaker: Breaker<u32, String> = BreakerBuilder::new()
///     .name("inventory")
///     .failure_threshold(3)
///     .open_timeout(Duration::from_secs(5))
///     .on_state_change(|from, to| println!("{from} -> {to}"))
///     .try_build()
///     .unwrap();
///
/// assert_eq!(breaker.state(), CircuitState::Closed);
/// ```
#[derive(Clone)]
pub struct BreakerBuilder {
    name: String,
    config: BreakerConfig,
    on_state_change: Option<StateChangeCallback>,
}

impl BreakerBuilder {
    pub fn new() -> Self {
        Self::from_config(BreakerConfig::default())
    }

    /// Start from an existing configuration, e.g. one loaded from a file.
    pub fn from_config(config: BreakerConfig) -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            config,
            on_state_change: None,
        }
    }

    /// Name reported in log events
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Failures while Closed before the circuit opens
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    /// Dwell time in Open before the circuit becomes eligible for HalfOpen
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.config.open_timeout = timeout;
        self
    }

    /// Failures while HalfOpen before the circuit re-opens
    pub fn retry_threshold(mut self, threshold: u32) -> Self {
        self.config.retry_threshold = threshold;
        self
    }

    /// Register a hook invoked synchronously with `(previous, new)` on every
    /// transition. Replaces any previously registered hook.
    pub fn on_state_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.on_state_change = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Build without validation.
    ///
    /// A zero threshold is accepted and only logged: the matching transition
    /// to Open can never fire. Use [`try_build`](Self::try_build) to reject it.
    pub fn build<T, E>(self) -> Breaker<T, E> {
        if self.config.has_unreachable_threshold() {
            warn!(
                breaker = %self.name,
                failure_threshold = self.config.failure_threshold,
                retry_threshold = self.config.retry_threshold,
                "Zero threshold configured; the circuit will never open through it"
            );
        }
        Breaker::from_parts(self.name, self.config, self.on_state_change)
    }

    /// Build after validating the configuration.
    pub fn try_build<T, E>(self) -> Result<Breaker<T, E>> {
        let config = self.config.validated()?;
        Ok(Breaker::from_parts(self.name, config, self.on_state_change))
    }

    pub fn build_no_result<E>(self) -> NoResultBreaker<E> {
        NoResultBreaker::from(self.build::<(), E>())
    }

    pub fn try_build_no_result<E>(self) -> Result<NoResultBreaker<E>> {
        self.try_build::<(), E>().map(NoResultBreaker::from)
    }
}

impl Default for BreakerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BreakerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakerBuilder")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("on_state_change", &self.on_state_change.is_some())
            .finish()
    }
}
