//! Cadence command-line player
//!
//! The binary wires the library crates together: SQLite library, on-disk
//! audio cache, HTTP catalog and the decoding pipeline, driven by a single
//! playback session.

pub mod config;
pub mod error;
