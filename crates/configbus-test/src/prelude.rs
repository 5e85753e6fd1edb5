//! Everything a test usually needs.

pub use crate::fixtures::*;
pub use crate::harness::*;
pub use crate::mocks::{FaultyKvStore, StoreFault};
