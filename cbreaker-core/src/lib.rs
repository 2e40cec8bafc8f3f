//! In-process circuit breaker.
//!
//! A [`Breaker`] guards calls to a dependency that may fail. After
//! `failure_threshold` failures it opens and stops calling the dependency,
//! replaying the failure that opened it. Once `open_timeout` has passed the
//! next call moves it to half-open, where calls are let through on trial:
//! a success closes the circuit, `retry_threshold` failures open it again.
//!
//! All work happens on the calling thread. The breaker never sleeps, polls
//! or retries on its own.
//!
//! # Example
//!
//! ```
//! use cbreaker_core::{Breaker, BreakerBuilder, CircuitState};
//! use std::time::Duration;
//!
//! let breaker: Breaker<String, String> = BreakerBuilder::new()
//!     .name("profile-service")
//!     .failure_threshold(2)
//!     .open_timeout(Duration::from_secs(30))
//!     .build();
//!
//! for _ in 0..2 {
//!     let _ = breaker.call(|| Err("connection refused".to_string()));
//! }
//! assert_eq!(breaker.state(), CircuitState::Open);
//!
//! // The operation is not invoked; the cached failure comes back instead
//! let result = breaker.call(|| Ok("profile".to_string()));
//! assert_eq!(result, Err("connection refused".to_string()));
//! ```

pub mod breaker;
pub mod builder;
pub mod config;
pub mod error;
pub mod no_result;
pub mod state;

pub use breaker::{Breaker, BreakerCounts};
pub use builder::{BreakerBuilder, DEFAULT_NAME};
pub use config::{
    BreakerConfig, DEFAULT_FAILURE_THRESHOLD, DEFAULT_OPEN_TIMEOUT, DEFAULT_RETRY_THRESHOLD,
};
pub use error::{BreakerError, Result};
pub use no_result::NoResultBreaker;
pub use state::{CircuitState, StateChangeCallback, Transition};
