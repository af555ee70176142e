//! Application layer use cases for the card reader agent.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure business rules, here in `cardreader-core`) and the infrastructure
//! (OS APIs, timers, files).  Use cases in this layer depend on traits such
//! as [`device_catalog::RawDeviceProvider`] and
//! [`decode_keystrokes::TimeoutScheduler`] rather than on Windows, so every
//! one of them runs in unit tests on any platform.
//!
//! # Sub-modules
//!
//! - **`decode_keystrokes`** – The keystroke decoder state machine.  Runs on
//!   every key press from every keyboard, so it must never block.
//!
//! - **`select_device`** – Binds the decoder to one device or unbinds it.
//!
//! - **`device_catalog`** – Lists keyboard-class devices and derives their
//!   display names.
//!
//! - **`event_sink`** – Fan-out channels for card numbers and diagnostics.
//!
//! - **`reader_service`** – The facade that ties the above together for the
//!   binary (and, later, a UI).

pub mod decode_keystrokes;
pub mod device_catalog;
pub mod event_sink;
pub mod reader_service;
pub mod select_device;
