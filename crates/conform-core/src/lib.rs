//! Conformance-verification engine for ASCOM Alpaca astronomy devices
//!
//! Exercises every property and method of a telescope or dome driver,
//! validates return values against the protocol's legal ranges, confirms
//! that capability flags are honestly reported, and confirms that
//! operations forbidden by a capability flag raise the correct fault
//! instead of silently succeeding.
//!
//! The engine is transport-agnostic: devices are consumed through the
//! async traits in [`device`], outcomes are emitted through the sink in
//! [`outcome`], and cancellation is observed through a
//! `tokio_util::sync::CancellationToken`. The harness binary wires in the
//! Alpaca REST adapters; the [`sim`] module provides in-memory devices for
//! tests and loopback runs.

pub mod capability;
pub mod config;
pub mod device;
pub mod dome;
pub mod error;
pub mod fault;
pub mod outcome;
pub mod sim;
pub mod telescope;
pub mod transform;

pub use capability::{DomeCapabilities, TelescopeCapabilities};
pub use config::Settings;
pub use dome::DomeTester;
pub use error::{ConformError, Result};
pub use fault::{DeviceFault, DeviceResult, FaultCodes, FaultKind, Required};
pub use outcome::{OutcomeSink, RecordingSink, Severity, TestOutcome};
pub use telescope::TelescopeTester;
