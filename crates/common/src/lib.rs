//! Shared building blocks for the results CMS crates.
//!
//! Logging bootstrap, startup environment checks and the small JSON
//! envelope types every HTTP surface answers with.

pub mod types;
pub mod utils;
pub mod env;
