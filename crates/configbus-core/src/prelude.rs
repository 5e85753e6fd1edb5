//! Common imports for users of the bus.
//!
//! ```
//! use configbus_core::prelude::*;
//! ```

pub use crate::{BusError, BusResult, ConfigBus, Document, RecordState};
