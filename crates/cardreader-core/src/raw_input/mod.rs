//! Raw input payloads and the key events decoded from them.
//!
//! The OS delivers one `RAWINPUT` record per device event.  [`codec`] turns
//! the record's bytes into a [`codec::RawInputRecord`]; keyboard records then
//! become a [`event::KeyEvent`] that the decoder consumes.

pub mod codec;
pub mod event;

pub use codec::{decode_raw_input, PayloadError, RawInputLayout, RawInputRecord, RawKeyboardRecord};
pub use event::{KeyEvent, KeyTransition};
