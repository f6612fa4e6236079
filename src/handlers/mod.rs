// Handler modules
pub mod cache;
pub mod definitions;
pub mod eol;
pub mod utils;

// Re-export all handler functions
pub use cache::handle_cache;
pub use definitions::handle_definitions;
pub use eol::{EolOptions, ScanOutcome, handle_eol};
