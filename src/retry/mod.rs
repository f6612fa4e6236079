//! # Retry Module
//!
//! Wraps a single remote call with classification-driven backoff.
//!
//! Every failed attempt is turned into a [`FailureInfo`] (message text plus any
//! HTTP status the transport exposed) and handed to an [`ErrorClassifier`]:
//!
//! | Kind | Delay after failed attempt `n` |
//! |------|-------------------------------|
//! | `RateLimited` | `base_delay * 2^(n-1)` |
//! | `Transient` | `base_delay * n` |
//! | `Fatal` | none, returned immediately |
//!
//! When the last allowed attempt fails transiently the error from that final
//! attempt is returned; failures are never turned into empty results here.

pub mod classifier;
pub mod error;
pub mod executor;
pub mod policy;

pub use classifier::{
    ClassificationRule, ErrorClassifier, ErrorKind, FailureInfo, PatternClassifier,
    RetryableError,
};
pub use error::RetryError;
pub use executor::{RetryExecutor, Sleeper, ThreadSleeper};
pub use policy::RetryPolicy;
