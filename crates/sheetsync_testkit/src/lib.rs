//! # sheetsync testkit
//!
//! Test utilities for sheetsync.
//!
//! This crate provides:
//! - Store fixtures (in-memory and file-backed) and seeded catalogs
//! - Property-based generators for products, edits and row images
//! - Fuzz harnesses for batch decoding and edit application
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sheetsync_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     with_temp_store(|store| {
//!         let keys = seed_catalog(store);
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod fuzz;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::fuzz::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use fuzz::*;
pub use generators::*;
