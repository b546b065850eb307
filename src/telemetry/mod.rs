//! # Telemetry Module
//!
//! Turns tracker entries into per-starter log lines.
//!
//! This module handles:
//! - Validating starter entries and extracting position, speed and device state
//! - Rendering samples in the fixed comma-separated line format
//! - Appending lines to one text file per starter

pub mod extractor;
pub mod sample;
pub mod sink;
