//! Breaker configuration.
//!
//! [`BreakerConfig`] holds the serializable part of a breaker's setup. The
//! state-change hook and the breaker name live on
//! [`BreakerBuilder`](crate::builder::BreakerBuilder), which fills every unset
//! option from the defaults below.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::error::Result;

/// Failures while Closed before the circuit opens.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 1;

/// Dwell time in Open before a trial call is allowed.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(60);

/// Failures while HalfOpen before the circuit re-opens.
pub const DEFAULT_RETRY_THRESHOLD: u32 = 1;

/// Configuration for a circuit breaker
///
/// Threshold comparisons are exact (`count == threshold`), so a threshold of
/// zero is never reached and the breaker never opens through that path.
/// [`validate`](Validate::validate) rejects zero thresholds for callers that
/// want the strict contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BreakerConfig {
    /// Failures observed while Closed that trip the circuit
    #[validate(range(min = 1))]
    pub failure_threshold: u32,
    /// Time spent Open before the next call moves the circuit to HalfOpen
    #[serde(rename = "open_timeout_ms", with = "duration_millis")]
    pub open_timeout: Duration,
    /// Failures observed while HalfOpen that re-open the circuit
    #[validate(range(min = 1))]
    pub retry_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            retry_threshold: DEFAULT_RETRY_THRESHOLD,
        }
    }
}

impl BreakerConfig {
    /// Validate and return the configuration unchanged.
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Open timeout in whole milliseconds, saturating at `u64::MAX`.
    pub fn open_timeout_ms(&self) -> u64 {
        duration_millis::saturating(&self.open_timeout)
    }

    /// True when a zero threshold makes one of the transitions to Open
    /// unreachable.
    pub fn has_unreachable_threshold(&self) -> bool {
        self.failure_threshold == 0 || self.retry_threshold == 0
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn saturating(duration: &Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(saturating(duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
