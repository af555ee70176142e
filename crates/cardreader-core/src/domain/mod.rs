//! Domain entities for the HID card reader agent.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain** (or "entities" layer).  Domain code:
//!
//! - Contains the core business rules of the application.
//! - Has **no** imports from OS APIs, timers, or UI frameworks.
//! - Can be compiled and tested on any platform without any external setup.
//!
//! Code in outer layers (application, infrastructure) depends on the domain,
//! but the domain never depends on them.

/// Validated card numbers.
pub mod card;
/// Decoder configuration value object.
pub mod config;
/// Device identity and display-name derivation.
pub mod device;
/// Diagnostics reported to log subscribers.
pub mod diagnostic;
