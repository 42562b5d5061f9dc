//! Value text as a Windows console debugger prints it.
//!
//! Integers are decimal with an `0n` prefix, pointers are zero-padded hex with
//! a backtick between the 32-bit halves, aggregates show `class Name` or
//! `struct Name`, enums `Enumerator (0n3)`.

use super::types::{normalize_type, Primitive, TypeShape};
use super::SimulatedProcess;
use crate::engine::{EngineError, EngineResult};
use crate::types::Address;

/// Text shown when the value's memory cannot be read.
pub const MEMORY_ERROR_TEXT: &str = "<Memory access error>";

/// Format a pointer value.
#[must_use]
pub fn format_pointer(value: u64, pointer_size: u64) -> String
{
    if pointer_size == 8 {
        format!("0x{:08x}`{:08x}", value >> 32, value & 0xffff_ffff)
    } else {
        format!("0x{:08x}", value & 0xffff_ffff)
    }
}

/// Engine text for a value of `type_name` stored at `address`.
pub(crate) fn format_value(process: &SimulatedProcess, type_name: &str, address: Option<Address>) -> String
{
    let normalized = normalize_type(type_name);
    let Some(shape) = process.types.shape(&normalized) else {
        return String::new();
    };
    if let TypeShape::Struct(def) = shape {
        return format!("{} {}", def.keyword.as_str(), def.name);
    }
    if let TypeShape::Array { element, count } = shape {
        return format!("{element} [{count}]");
    }
    let Some(address) = address else {
        return String::new();
    };
    match shape {
        TypeShape::Primitive(p) => format_primitive(process, p, address).unwrap_or_else(|_| MEMORY_ERROR_TEXT.to_string()),
        TypeShape::Pointer(_) => process
            .read_unsigned(address, process.pointer_size)
            .map(|v| format_pointer(v, process.pointer_size))
            .unwrap_or_else(|_| MEMORY_ERROR_TEXT.to_string()),
        TypeShape::Enum(def) => match process.read_signed(address, def.size) {
            Ok(v) => match def.values.iter().find(|e| e.value == v) {
                Some(e) => format!("{} (0n{v})", e.name),
                None => format!("0n{v}"),
            },
            Err(_) => MEMORY_ERROR_TEXT.to_string(),
        },
        TypeShape::Struct(_) | TypeShape::Array { .. } => String::new(),
    }
}

fn format_primitive(process: &SimulatedProcess, p: Primitive, address: Address) -> EngineResult<String>
{
    let size = p.size(process.pointer_size);
    if p == Primitive::Bool {
        return Ok(if process.read_unsigned(address, 1)? == 0 { "false" } else { "true" }.to_string());
    }
    if p == Primitive::Float {
        let bits = u32::try_from(process.read_unsigned(address, 4)?).unwrap_or_default();
        return Ok(f32::from_bits(bits).to_string());
    }
    if p == Primitive::Double {
        return Ok(f64::from_bits(process.read_unsigned(address, 8)?).to_string());
    }
    let text = if p.is_signed() {
        format!("0n{}", process.read_signed(address, size)?)
    } else {
        format!("0n{}", process.read_unsigned(address, size)?)
    };
    if p.is_character() {
        let code = process.read_unsigned(address, size)?;
        if let Some(c) = u32::try_from(code).ok().and_then(char::from_u32).filter(|c| !c.is_control()) {
            return Ok(format!("{text} '{c}'"));
        }
    }
    Ok(text)
}

/// Parse an integer literal: decimal, `0n` decimal, `0x` hex (backticks
/// allowed) or a quoted character.
pub(crate) fn parse_integer(text: &str) -> Option<i128>
{
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i128::from_str_radix(&hex.replace('`', ""), 16).ok()?
    } else if let Some(dec) = digits.strip_prefix("0n") {
        dec.parse().ok()?
    } else if digits.len() >= 3 && digits.starts_with('\'') && digits.ends_with('\'') {
        let mut chars = digits[1..digits.len() - 1].chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        i128::from(u32::from(c))
    } else {
        digits.parse().ok()?
    };
    Some(if negative { -value } else { value })
}

/// Encode assignment text into the bytes stored for `type_name`.
pub(crate) fn encode_value(process: &SimulatedProcess, type_name: &str, text: &str) -> EngineResult<Vec<u8>>
{
    let invalid = || EngineError::InvalidValue(format!("'{text}' for type {type_name}"));
    let normalized = normalize_type(type_name);
    let shape = process
        .types
        .shape(&normalized)
        .ok_or_else(|| EngineError::TypeNotFound(type_name.to_string()))?;
    let trimmed = text.trim();
    match shape {
        TypeShape::Primitive(Primitive::Bool) => match trimmed {
            "true" => Ok(vec![1]),
            "false" => Ok(vec![0]),
            other => Ok(vec![u8::from(parse_integer(other).ok_or_else(invalid)? != 0)]),
        },
        TypeShape::Primitive(Primitive::Float) => {
            let value: f32 = trimmed.parse().map_err(|_| invalid())?;
            Ok(value.to_le_bytes().to_vec())
        }
        TypeShape::Primitive(Primitive::Double) => {
            let value: f64 = trimmed.parse().map_err(|_| invalid())?;
            Ok(value.to_le_bytes().to_vec())
        }
        TypeShape::Primitive(p) => {
            let value = parse_integer(trimmed).ok_or_else(invalid)?;
            integer_bytes(value, p.size(process.pointer_size), p.is_signed()).ok_or_else(invalid)
        }
        TypeShape::Pointer(_) => {
            let value = parse_integer(trimmed).ok_or_else(invalid)?;
            integer_bytes(value, process.pointer_size, false).ok_or_else(invalid)
        }
        TypeShape::Enum(def) => {
            let value = match def.values.iter().find(|e| e.name == trimmed) {
                Some(e) => i128::from(e.value),
                None => parse_integer(trimmed).ok_or_else(invalid)?,
            };
            integer_bytes(value, def.size, true).ok_or_else(invalid)
        }
        TypeShape::Struct(_) | TypeShape::Array { .. } => {
            Err(EngineError::Unsupported(format!("cannot assign to aggregate of type {type_name}")))
        }
    }
}

/// Little-endian bytes of `value` if it fits `size` bytes.
fn integer_bytes(value: i128, size: u64, signed: bool) -> Option<Vec<u8>>
{
    let bits = u32::try_from(size * 8).ok().filter(|b| (8..=64).contains(b))?;
    let fits = if signed {
        let min = -(1i128 << (bits - 1));
        let max = (1i128 << bits) - 1;
        value >= min && value <= max
    } else {
        value >= 0 && value < (1i128 << bits)
    };
    if !fits {
        return None;
    }
    let len = usize::try_from(size).ok()?;
    Some(value.to_le_bytes()[..len].to_vec())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_format_pointer()
    {
        assert_eq!(format_pointer(0x1000, 8), "0x00000000`00001000");
        assert_eq!(format_pointer(0x1000, 4), "0x00001000");
    }

    #[test]
    fn test_parse_integer()
    {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("-0n7"), Some(-7));
        assert_eq!(parse_integer("0x00000000`00001000"), Some(0x1000));
        assert_eq!(parse_integer("'A'"), Some(65));
        assert_eq!(parse_integer("abc"), None);
    }

    #[test]
    fn test_integer_bytes_range()
    {
        assert_eq!(integer_bytes(-1, 4, true), Some(vec![0xff; 4]));
        assert_eq!(integer_bytes(255, 1, false), Some(vec![0xff]));
        assert_eq!(integer_bytes(256, 1, false), None);
        assert_eq!(integer_bytes(-1, 2, false), None);
    }
}
