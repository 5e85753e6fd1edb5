//! Configbus Test - Shared test utilities for configbus.
//!
//! This crate provides fixtures, a fault-injecting store and small harness
//! helpers that can be used across configbus crates as a dev-dependency.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! configbus-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use configbus_test::{FaultyKvStore, test_bus_over, test_document};
//!
//! #[test]
//! fn test_save_survives_failed_compact_write() {
//!     let store = FaultyKvStore::shared();
//!     let bus = test_bus_over(store.clone());
//!     store.fail_writes_to("pulsfan:mp");
//!
//!     assert!(bus.save("pulsfan", &test_document()));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
