//! Configbus Telemetry - Logging setup for configbus.
//!
//! The library crates only emit `tracing` events; this crate installs the
//! subscriber that renders them.
//!
//! # Example
//!
//! ```rust,no_run
//! use configbus_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), configbus_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("configbus_core=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
