//! Breaker for operations whose success value is not interesting.

use std::future::Future;

use crate::breaker::{Breaker, BreakerCounts};
use crate::builder::BreakerBuilder;
use crate::config::BreakerConfig;
use crate::state::CircuitState;

/// Circuit breaker that only reports whether the guarded operation failed.
///
/// Delegates everything to a `Breaker<(), E>`; the success value of the
/// operation is dropped.
pub struct NoResultBreaker<E> {
    inner: Breaker<(), E>,
}

impl<E> NoResultBreaker<E> {
    pub fn new() -> Self {
        BreakerBuilder::new().build_no_result()
    }

    pub fn with_config(config: BreakerConfig) -> Self {
        BreakerBuilder::from_config(config).build_no_result()
    }

    pub fn state(&self) -> CircuitState {
        self.inner.state()
    }

    pub fn counts(&self) -> BreakerCounts {
        self.inner.counts()
    }

    pub fn reset(&self) {
        self.inner.reset()
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn inner(&self) -> &Breaker<(), E> {
        &self.inner
    }
}

impl<E: Clone> NoResultBreaker<E> {
    /// Run `operation` under the breaker and return only its error, if any.
    pub fn call<R, F>(&self, operation: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<R, E>,
    {
        self.inner.call(|| operation().map(drop))
    }

    pub async fn call_async<R, F, Fut>(&self, operation: F) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        self.inner
            .call_async(|| async move { operation().await.map(drop) })
            .await
    }
}

impl<E> From<Breaker<(), E>> for NoResultBreaker<E> {
    fn from(inner: Breaker<(), E>) -> Self {
        Self { inner }
    }
}

impl<E> Default for NoResultBreaker<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for NoResultBreaker<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NoResultBreaker").field(&self.inner).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_no_result_breaker_success() {
        let breaker: NoResultBreaker<String> = NoResultBreaker::new();

        assert_eq!(breaker.call(|| Ok::<_, String>("ignored")), Ok(()));
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_no_result_breaker_replays_error() {
        let breaker: NoResultBreaker<String> = BreakerBuilder::new()
            .failure_threshold(2)
            .build_no_result();

        assert_eq!(
            breaker.call(|| Err::<u64, _>("disk full".to_string())),
            Err("disk full".to_string())
        );
        assert_eq!(
            breaker.call(|| Err::<u64, _>("disk gone".to_string())),
            Err("disk gone".to_string())
        );
        assert_eq!(breaker.state(), CircuitState::Open);

        assert_eq!(
            breaker.call(|| Ok::<u64, String>(1)),
            Err("disk gone".to_string())
        );
    }

    #[test]
    fn test_state_delegates_to_inner() {
        let breaker: NoResultBreaker<&str> = NoResultBreaker::with_config(BreakerConfig {
            failure_threshold: 1,
            open_timeout: Duration::from_secs(60),
            retry_threshold: 1,
        });

        let _ = breaker.call(|| Err::<(), _>("boom"));

        assert_eq!(breaker.state(), breaker.inner().state());
        assert_eq!(breaker.counts(), breaker.inner().counts());

        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.inner().state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_call_async_discards_value() {
        let breaker: NoResultBreaker<String> = NoResultBreaker::new();

        let result = breaker.call_async(|| async { Ok::<_, String>(99u8) }).await;
        assert_eq!(result, Ok(()));

        let result = breaker
            .call_async(|| async { Err::<u8, _>("offline".to_string()) })
            .await;
        assert_eq!(result, Err("offline".to_string()));
        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
