//! Multi-resolution ICO container output
//!
//! Only PNG-compressed entries are produced; every Windows release since
//! Vista reads them, and they keep full 8-bit alpha.

mod encoder;

pub use encoder::{encode_ico, IconDirectory, IconEntry, DIR_ENTRY_LEN, HEADER_LEN};
