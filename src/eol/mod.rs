//! # EOL Reconciliation
//!
//! Joins live Azure resources against the published service retirement dataset.
//!
//! A scan runs in four stages:
//! - load the retirement definitions and the classification query
//!   (remote, then cache, then the copy bundled into the binary)
//! - scope the query to the requested subscriptions and run it with retries
//! - group returned rows by the `ServiceID` the query computed
//! - classify each group by how close its retirement date is
//!
//! Any failure to obtain data is downgraded to a warning and reported as an
//! unavailable [`EolScanReport`]; it never aborts the caller.

pub mod cache;
pub mod classify;
pub mod definitions;
pub mod error;
pub mod finding;
pub mod query;
pub mod reconciler;
pub mod sources;

pub use cache::DefinitionCache;
pub use classify::{Classification, EolSeverity, EolStatus};
pub use definitions::{DefinitionBundle, DefinitionSet, DefinitionTier, DeprecationDefinition};
pub use error::EolError;
pub use finding::{Availability, EolFinding, EolScanReport};
pub use reconciler::EolReconciler;
pub use sources::{
    BundledDefinitionSource, CachedDefinitionSource, DefinitionChain, DefinitionSource,
    RemoteDefinitionSource,
};
