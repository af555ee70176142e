//! Infrastructure layer for the card reader agent.
//!
//! Contains OS-facing adapters: the Raw Input API (device list, registry
//! lookups, background registration, and the `WM_INPUT` window), the Tokio
//! timer behind the decoder's inactivity timeout, and file-system storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `cardreader_core`; the application layer only reaches in for the
//! registrar seam and the persisted settings types.

pub mod raw_input;
pub mod storage;
pub mod timer;
