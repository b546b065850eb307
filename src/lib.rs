//! # Racemap Logger Library
//!
//! Poll a Racemap event and append each starter's telemetry to a text log.
//!
//! This library provides the poll loop, the record extractor and the log
//! sinks used by the `racemap-logger` binary.

pub mod config;
pub mod error;
pub mod poller;
pub mod roster;
pub mod shutdown;
pub mod telemetry;
