//! Azure Resource Manager access
//!
//! Blocking clients for the remote capabilities the EOL scan depends on:
//! Resource Graph queries, subscription discovery and plain dataset downloads.
//! Each capability sits behind a small trait so the reconciler can be driven by
//! in-memory fakes.

pub mod client;
pub mod credentials;
pub mod error;
pub mod traits;
pub mod types;

pub use client::{AzureClient, HttpTextFetcher};
pub use error::{AzureApiError, Result};
pub use traits::{ResourceQuery, SubscriptionSource, TextFetcher};
pub use types::{ResourceRecord, Subscription};
