//! Integration test crate for the Tidal oracle synchronization engine.
//!
//! This crate has no library code. It only contains integration tests
//! that exercise source-to-destination flows across the workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p tidal-integration-tests
//! ```
