//! String layouts.
//!
//! | type | layout |
//! |---|---|
//! | `QString`/`QByteArray`, major version 4 | `d` points to a header with `size` and `data` members |
//! | `QString`/`QByteArray`, major version 5 | `d` points to a shared header (`ref`, `size`, `alloc`, `offset`); data at `d + offset` |
//! | `QString`/`QByteArray`, major version 6 | `d` is an inline `{d, ptr, size}` triple |
//! | `std::string`/`std::wstring` | `_Bx` union: inline `_Buf` while `_Myres` is below the buffer size, else `_Ptr` |

use symgroup_protocol::{CharWidth, ValueEncoding};

use super::{KnownType, SimpleDump};
use crate::engine::memory::align_up;
use crate::error::{Result, SymbolGroupError};
use crate::tree::RawValue;
use crate::types::Address;
use crate::value::{DumpContext, SymbolGroupValue};

/// Upper bound for bytes read for the separate-window display.
const MAX_RAW_BYTES: u64 = 1 << 20;

/// Size of the inline buffer of `std::basic_string` in bytes.
const STD_STRING_BUFFER: u64 = 16;

/// Shared array header of major version 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayHeader
{
    pub ref_count: i32,
    pub size: i32,
    pub alloc: u32,
    pub offset: i64,
}

impl ArrayHeader
{
    /// Offset of the `offset` member: after `ref`, `size` and `alloc`,
    /// aligned to the pointer size.
    #[must_use]
    pub fn offset_position(pointer_size: u64) -> u64
    {
        align_up(12, pointer_size)
    }

    /// Read the header at `d`.
    ///
    /// ## Errors
    ///
    /// Engine errors for unreadable memory.
    pub fn read(ctx: &DumpContext<'_>, d: Address) -> Result<Self>
    {
        let pointer_size = ctx.pointer_size();
        let ref_count = ctx.read_i32(d)?;
        let size = ctx.read_i32(d + 4)?;
        let alloc = u32::try_from(ctx.read_unsigned(d + 8, 4)?).unwrap_or_default() & 0x7fff_ffff;
        #[allow(clippy::cast_possible_wrap)]
        let offset = match pointer_size {
            8 => ctx.read_unsigned(d + Self::offset_position(8), 8)? as i64,
            _ => i64::from(ctx.read_i32(d + Self::offset_position(4))?),
        };
        Ok(Self {
            ref_count,
            size,
            alloc,
            offset,
        })
    }

    /// Address of the first character.
    #[must_use]
    pub fn data(&self, d: Address) -> Address
    {
        Address::new(d.value().wrapping_add_signed(self.offset))
    }

    /// Whether the data can be written in place for `chars` characters
    /// (unshared and large enough, terminator included).
    #[must_use]
    pub fn can_hold(&self, chars: usize) -> bool
    {
        self.ref_count == 1 && usize::try_from(self.alloc).is_ok_and(|alloc| alloc > chars)
    }
}

/// Where a string's characters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringLocation
{
    pub data: Address,
    /// Length in characters
    pub size: usize,
    pub width: CharWidth,
}

/// Character width of a string type.
#[must_use]
pub fn char_width(known: KnownType) -> CharWidth
{
    match known {
        KnownType::QString | KnownType::StdWString => CharWidth::Wide,
        _ => CharWidth::Narrow,
    }
}

fn dumper_error(value: &SymbolGroupValue) -> SymbolGroupError
{
    SymbolGroupError::Dumper(value.error().to_string())
}

fn checked_size(size: i64) -> Result<usize>
{
    usize::try_from(size).map_err(|_| SymbolGroupError::Dumper(format!("corrupt string size {size}")))
}

/// Locate the characters of a string value.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] for missing members or inconsistent headers.
pub fn locate(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, known: KnownType) -> Result<StringLocation>
{
    let width = char_width(known);
    match known {
        KnownType::QString | KnownType::QByteArray => locate_qt(ctx, value, width),
        KnownType::StdString | KnownType::StdWString => locate_std(ctx, value, width),
        _ => Err(SymbolGroupError::Dumper(format!("{known:?} is not a string"))),
    }
}

fn locate_qt(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, width: CharWidth) -> Result<StringLocation>
{
    let major = ctx.library().major_version;
    let d = value.member(ctx, "d");
    if !d.is_valid() {
        return Err(dumper_error(&d));
    }
    match major {
        4 => {
            let size = d.member(ctx, "size");
            let data = d.member(ctx, "data");
            if !size.is_valid() || !data.is_valid() {
                return Err(dumper_error(if size.is_valid() { &data } else { &size }));
            }
            Ok(StringLocation {
                data: Address::new(data.pointer_value(ctx.group, 0)),
                size: checked_size(size.int_value(ctx.group, -1))?,
                width,
            })
        }
        6 => {
            let size = d.member(ctx, "size");
            let ptr = d.member(ctx, "ptr");
            if !size.is_valid() || !ptr.is_valid() {
                return Err(dumper_error(if size.is_valid() { &ptr } else { &size }));
            }
            Ok(StringLocation {
                data: Address::new(ptr.pointer_value(ctx.group, 0)),
                size: checked_size(size.int_value(ctx.group, -1))?,
                width,
            })
        }
        _ => {
            let d = Address::new(d.pointer_value(ctx.group, 0));
            if d.is_null() {
                return Err(SymbolGroupError::Dumper("null string header".to_string()));
            }
            let header = ArrayHeader::read(ctx, d)?;
            if header.size < 0 || (header.alloc > 0 && header.size.unsigned_abs() > header.alloc) {
                return Err(SymbolGroupError::Dumper(format!(
                    "corrupt string header (size {}, alloc {})",
                    header.size, header.alloc
                )));
            }
            Ok(StringLocation {
                data: header.data(d),
                size: checked_size(i64::from(header.size))?,
                width,
            })
        }
    }
}

fn locate_std(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, width: CharWidth) -> Result<StringLocation>
{
    let size = value.find_member(ctx, "_Mysize");
    let reserved = value.find_member(ctx, "_Myres");
    let buffer = value.find_member(ctx, "_Bx");
    for member in [&size, &reserved, &buffer] {
        if !member.is_valid() {
            return Err(dumper_error(member));
        }
    }
    let size = checked_size(size.int_value(ctx.group, -1))?;
    let reserved = reserved.int_value(ctx.group, 0);
    let buffer_address = buffer
        .address(ctx.group)
        .ok_or_else(|| SymbolGroupError::Dumper("string buffer has no address".to_string()))?;
    let inline_capacity = STD_STRING_BUFFER / width.bytes() as u64;
    let data = if u64::try_from(reserved).is_ok_and(|r| r < inline_capacity) {
        buffer_address
    } else {
        ctx.read_pointer(buffer_address)?
    };
    Ok(StringLocation { data, size, width })
}

/// Read `chars` characters at a location.
///
/// ## Errors
///
/// Engine errors for unreadable memory.
pub fn read_chars(ctx: &DumpContext<'_>, data: Address, chars: usize, width: CharWidth) -> Result<Vec<u8>>
{
    let bytes = (chars as u64).saturating_mul(width.bytes() as u64).min(MAX_RAW_BYTES);
    if bytes == 0 {
        return Ok(Vec::new());
    }
    Ok(ctx.read(data, usize::try_from(bytes).unwrap_or(0))?)
}

/// Decode string bytes for display.
#[must_use]
pub fn decode(bytes: &[u8], width: CharWidth, latin1: bool) -> String
{
    match width {
        CharWidth::Wide => {
            let units: Vec<u16> = bytes.chunks_exact(2).map(|p| u16::from_le_bytes([p[0], p[1]])).collect();
            String::from_utf16_lossy(&units)
        }
        CharWidth::Narrow if latin1 => bytes.iter().map(|b| char::from(*b)).collect(),
        CharWidth::Narrow => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Quote a string for display, truncating it to `limit` characters.
#[must_use]
pub fn quote(text: &str, limit: usize) -> String
{
    let mut quoted = String::with_capacity(text.len().min(limit) + 5);
    quoted.push('"');
    let mut chars = text.chars();
    quoted.extend(chars.by_ref().take(limit));
    quoted.push('"');
    if chars.next().is_some() {
        quoted.push_str("...");
    }
    quoted
}

/// Format a string value located at `location`.
///
/// ## Errors
///
/// Engine errors for unreadable memory.
pub fn format_location(ctx: &DumpContext<'_>, location: StringLocation, known: KnownType) -> Result<SimpleDump>
{
    let bytes = read_chars(ctx, location.data, location.size, location.width)?;
    let latin1 = known == KnownType::QByteArray;
    let text = decode(&bytes, location.width, latin1);
    let encoding = match (location.width, known) {
        (CharWidth::Wide, _) => ValueEncoding::HexUtf16,
        (CharWidth::Narrow, KnownType::QByteArray) => ValueEncoding::HexLatin1,
        (CharWidth::Narrow, _) => ValueEncoding::HexUtf8,
    };
    Ok(SimpleDump::text(quote(&text, ctx.settings.string_limit)).with_raw(RawValue { encoding, bytes }))
}

/// Simple dumper for all string types.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] if the layout cannot be decoded.
pub fn dump_string(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, known: KnownType) -> Result<SimpleDump>
{
    let location = locate(ctx, value, known)?;
    format_location(ctx, location, known)
}

/// Read a major-version-5 `QString` given its `d` pointer (used for strings
/// reached through private layouts).
///
/// ## Errors
///
/// Engine errors for unreadable memory.
pub fn read_qt5_string(ctx: &DumpContext<'_>, d: Address) -> Result<String>
{
    if d.is_null() {
        return Ok(String::new());
    }
    let header = ArrayHeader::read(ctx, d)?;
    let size = checked_size(i64::from(header.size))?;
    let bytes = read_chars(ctx, header.data(d), size, CharWidth::Wide)?;
    Ok(decode(&bytes, CharWidth::Wide, false))
}
