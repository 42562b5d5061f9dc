//! Value encodings.
//!
//! Values that are not safely printable as 7-bit text (strings with control
//! characters, non-ASCII data) travel hex or base64 encoded, tagged with a
//! numeric discriminant in the record's `valueencoded` field. Values sent
//! *to* the extension for assignment use a smaller set of encodings
//! ([`AssignEncoding`]).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::{ProtocolError, ProtocolResult};

/// Encoding of a `value` field in an outgoing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum ValueEncoding
{
    /// Printable text, sent as is
    #[default]
    Plain,
    /// Base64 of UTF-16LE code units
    Base64Utf16,
    /// Hex pairs of Latin-1 bytes
    HexLatin1,
    /// Hex pairs of UTF-16LE code units
    HexUtf16,
    /// Hex pairs of UTF-8 bytes
    HexUtf8,
}

impl ValueEncoding
{
    /// Numeric discriminant used on the wire.
    #[must_use]
    pub const fn code(self) -> u32
    {
        match self {
            Self::Plain => 0,
            Self::Base64Utf16 => 2,
            Self::HexLatin1 => 6,
            Self::HexUtf16 => 7,
            Self::HexUtf8 => 9,
        }
    }

    /// Encode raw bytes for this encoding.
    ///
    /// [`ValueEncoding::Plain`] interprets the bytes as UTF-8, replacing
    /// invalid sequences.
    #[must_use]
    pub fn encode(self, bytes: &[u8]) -> String
    {
        match self {
            Self::Plain => String::from_utf8_lossy(bytes).into_owned(),
            Self::Base64Utf16 => BASE64.encode(bytes),
            Self::HexLatin1 | Self::HexUtf16 | Self::HexUtf8 => hex::encode(bytes),
        }
    }
}

/// True if `text` can be sent unencoded: printable 7-bit ASCII only.
#[must_use]
pub fn is_plain_text(text: &str) -> bool
{
    text.bytes().all(|b| (0x20..0x7f).contains(&b))
}

/// UTF-16LE byte serialisation of `units`.
#[must_use]
pub fn utf16_le_bytes(units: &[u16]) -> Vec<u8>
{
    units.iter().flat_map(|unit| unit.to_le_bytes()).collect()
}

/// Encoding of a value sent by the IDE for assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignEncoding
{
    /// The value is plain text
    #[default]
    Plain,
    /// Hex pairs that decode to bytes
    HexBytes,
    /// Hex pairs that decode to UTF-16LE code units
    HexUtf16,
}

impl AssignEncoding
{
    /// Decode the wire discriminant.
    ///
    /// ## Errors
    ///
    /// Returns [`ProtocolError::UnknownEncoding`] for unknown codes.
    pub fn from_code(code: u32) -> ProtocolResult<Self>
    {
        match code {
            0 => Ok(Self::Plain),
            1 => Ok(Self::HexBytes),
            2 => Ok(Self::HexUtf16),
            other => Err(ProtocolError::UnknownEncoding(other)),
        }
    }
}

/// Character width of the assignment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharWidth
{
    /// One byte per character
    Narrow,
    /// Two bytes per character (UTF-16)
    Wide,
}

impl CharWidth
{
    /// Size of one character in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize
    {
        match self {
            Self::Narrow => 1,
            Self::Wide => 2,
        }
    }
}

/// Decode an assignment payload into the byte representation of a string of
/// the given character width (without terminator).
///
/// ## Errors
///
/// Returns an error if hex decoding fails or a UTF-16 payload has an odd
/// number of bytes.
pub fn decode_assign_value(value: &str, encoding: AssignEncoding, width: CharWidth) -> ProtocolResult<Vec<u8>>
{
    match (encoding, width) {
        (AssignEncoding::Plain, CharWidth::Narrow) => Ok(value.as_bytes().to_vec()),
        (AssignEncoding::Plain, CharWidth::Wide) => Ok(utf16_le_bytes(&value.encode_utf16().collect::<Vec<_>>())),
        (AssignEncoding::HexBytes, CharWidth::Narrow) => Ok(hex::decode(value.trim())?),
        (AssignEncoding::HexBytes, CharWidth::Wide) => {
            let bytes = hex::decode(value.trim())?;
            Ok(bytes.iter().flat_map(|b| u16::from(*b).to_le_bytes()).collect())
        }
        (AssignEncoding::HexUtf16, CharWidth::Wide) => {
            let bytes = hex::decode(value.trim())?;
            if bytes.len() % 2 != 0 {
                return Err(ProtocolError::OddUtf16Length(bytes.len()));
            }
            Ok(bytes)
        }
        (AssignEncoding::HexUtf16, CharWidth::Narrow) => {
            let units = decode_utf16_units(value)?;
            Ok(String::from_utf16_lossy(&units).into_bytes())
        }
    }
}

/// Decode an assignment payload for a scalar into the text handed to the
/// engine's expression evaluator.
///
/// ## Errors
///
/// Returns an error if hex decoding fails.
pub fn decode_assign_text(value: &str, encoding: AssignEncoding) -> ProtocolResult<String>
{
    match encoding {
        AssignEncoding::Plain => Ok(value.to_string()),
        AssignEncoding::HexBytes => Ok(String::from_utf8_lossy(&hex::decode(value.trim())?).into_owned()),
        AssignEncoding::HexUtf16 => Ok(String::from_utf16_lossy(&decode_utf16_units(value)?)),
    }
}

fn decode_utf16_units(value: &str) -> ProtocolResult<Vec<u16>>
{
    let bytes = hex::decode(value.trim())?;
    if bytes.len() % 2 != 0 {
        return Err(ProtocolError::OddUtf16Length(bytes.len()));
    }
    Ok(bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_plain_text_detection()
    {
        assert!(is_plain_text("hello world"));
        assert!(!is_plain_text("tab\there"));
        assert!(!is_plain_text("caf\u{e9}"));
    }

    #[test]
    fn test_codes()
    {
        assert_eq!(ValueEncoding::Plain.code(), 0);
        assert_eq!(ValueEncoding::HexUtf16.code(), 7);
        assert_eq!(AssignEncoding::from_code(2).unwrap(), AssignEncoding::HexUtf16);
        assert_eq!(AssignEncoding::from_code(9), Err(ProtocolError::UnknownEncoding(9)));
    }

    #[test]
    fn test_hex_encoding_of_utf16()
    {
        let bytes = utf16_le_bytes(&[u16::from(b'h'), u16::from(b'i')]);
        assert_eq!(ValueEncoding::HexUtf16.encode(&bytes), "68006900");
        assert_eq!(ValueEncoding::Base64Utf16.encode(&bytes), "aABpAA==");
    }

    #[test]
    fn test_decode_plain_wide()
    {
        let bytes = decode_assign_value("ab", AssignEncoding::Plain, CharWidth::Wide).unwrap();
        assert_eq!(bytes, vec![b'a', 0, b'b', 0]);
    }

    #[test]
    fn test_decode_hex_bytes_widened()
    {
        let bytes = decode_assign_value("4142", AssignEncoding::HexBytes, CharWidth::Wide).unwrap();
        assert_eq!(bytes, vec![0x41, 0, 0x42, 0]);
        let narrow = decode_assign_value("4142", AssignEncoding::HexBytes, CharWidth::Narrow).unwrap();
        assert_eq!(narrow, b"AB".to_vec());
    }

    #[test]
    fn test_decode_utf16_narrowed()
    {
        let bytes = decode_assign_value("41004200", AssignEncoding::HexUtf16, CharWidth::Narrow).unwrap();
        assert_eq!(bytes, b"AB".to_vec());
        assert_eq!(
            decode_assign_value("410042", AssignEncoding::HexUtf16, CharWidth::Wide),
            Err(ProtocolError::OddUtf16Length(3))
        );
    }

    #[test]
    fn test_decode_scalar_text()
    {
        assert_eq!(decode_assign_text("42", AssignEncoding::Plain).unwrap(), "42");
        assert_eq!(decode_assign_text("3432", AssignEncoding::HexBytes).unwrap(), "42");
        assert!(decode_assign_text("zz", AssignEncoding::HexBytes).is_err());
    }
}
