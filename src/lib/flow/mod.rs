//! Fixed-width network-flow record model and file codec.
//!
//! A flow record is a POD byte slab of [`record::RECORD_SIZE`] bytes with
//! little-endian integer fields and wide (16-byte) network-order addresses.
//! Flow files are an 8-byte header followed by raw records; see [`stream`].

pub mod record;
pub mod stream;

pub use record::{FlowRecord, FlowView, RECORD_SIZE};
pub use stream::{FlowReader, FlowWriter, FILE_HEADER_LEN};
