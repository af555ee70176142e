//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML settings file from the
//! platform-appropriate directory, supplies defaults on first run, and writes
//! the bound device back on shutdown so the next start can restore it.

pub mod config;
