//! Protocol error type.

use thiserror::Error;

/// Errors raised while decoding requests or encoded values.
#[derive(Error, Debug, PartialEq)]
pub enum ProtocolError
{
    /// A hex-encoded payload could not be decoded
    #[error("Invalid hex payload: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// A UTF-16 payload did not contain a whole number of code units
    #[error("UTF-16 payload has odd length {0}")]
    OddUtf16Length(usize),

    /// Unknown assignment encoding discriminant
    #[error("Unknown value encoding {0}")]
    UnknownEncoding(u32),

    /// Unknown display format code
    #[error("Unknown display format {0}")]
    UnknownFormat(u32),

    /// A format map entry is not `key:code`
    #[error("Invalid format map entry '{0}'")]
    InvalidFormatEntry(String),

    /// A response line does not have the `token|kind|remaining|command|payload` shape
    #[error("Malformed response line '{0}'")]
    MalformedLine(String),
}

/// Convenience alias for protocol results.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
