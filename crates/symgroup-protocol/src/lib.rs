//! # symgroup-protocol
//!
//! Communication layer between the symgroup extension and the IDE.
//!
//! - [`record`]: value records and their GDBMI rendering
//! - [`encoding`]: value encodings in both directions
//! - [`request`]: dump request parameters (frame, expanded inames, formats)
//! - [`response`]: response lines, chunking and reassembly

pub mod encoding;
pub mod error;
pub mod gdbmi;
pub mod record;
pub mod request;
pub mod response;

pub use encoding::{AssignEncoding, CharWidth, ValueEncoding};
pub use error::{ProtocolError, ProtocolResult};
pub use gdbmi::GdbmiWriter;
pub use record::{write_record_list, ValueRecord};
pub use request::{parse_iname_list, DisplayFormat, DumpRequest, FormatMap};
pub use response::{Reassembler, Response, ResponseKind};
