//! Typed reads and writes on top of [`DebugTarget`] byte access.

use tracing::trace;

use super::{DebugTarget, EngineError, EngineResult};
use crate::types::Address;

/// Read an unsigned little-endian integer of 1, 2, 4 or 8 bytes.
///
/// ## Errors
///
/// Fails if the memory is inaccessible or `size` is not a supported width.
pub fn read_unsigned(target: &dyn DebugTarget, address: Address, size: u64) -> EngineResult<u64>
{
    let len = usize::try_from(size).map_err(|_| EngineError::InvalidValue(format!("integer width {size}")))?;
    if !matches!(len, 1 | 2 | 4 | 8) {
        return Err(EngineError::InvalidValue(format!("integer width {size}")));
    }
    let bytes = target.read_memory(address, len)?;
    let mut buf = [0u8; 8];
    buf[..len].copy_from_slice(&bytes[..len]);
    let value = u64::from_le_bytes(buf);
    trace!("read {len} bytes at {address}: {value:#x}");
    Ok(value)
}

/// Read a signed little-endian integer of 1, 2, 4 or 8 bytes.
///
/// ## Errors
///
/// Fails if the memory is inaccessible or `size` is not a supported width.
pub fn read_signed(target: &dyn DebugTarget, address: Address, size: u64) -> EngineResult<i64>
{
    let raw = read_unsigned(target, address, size)?;
    let shift = 64 - size * 8;
    #[allow(clippy::cast_possible_wrap)]
    Ok(((raw << shift) as i64) >> shift)
}

/// Read a pointer of the debuggee's pointer width.
///
/// ## Errors
///
/// Fails if the memory is inaccessible.
pub fn read_pointer(target: &dyn DebugTarget, address: Address) -> EngineResult<Address>
{
    read_unsigned(target, address, target.pointer_size()).map(Address::new)
}

/// Read a 32-bit signed integer.
///
/// ## Errors
///
/// Fails if the memory is inaccessible.
pub fn read_i32(target: &dyn DebugTarget, address: Address) -> EngineResult<i32>
{
    let value = read_signed(target, address, 4)?;
    i32::try_from(value).map_err(|_| EngineError::InvalidValue(value.to_string()))
}

/// Write an unsigned little-endian integer of the given width.
///
/// ## Errors
///
/// Fails if the memory is not writable.
pub fn write_unsigned(target: &mut dyn DebugTarget, address: Address, size: u64, value: u64) -> EngineResult<()>
{
    let len = usize::try_from(size.min(8)).unwrap_or(8);
    let bytes = value.to_le_bytes();
    target.write_memory(address, &bytes[..len])
}

/// Round `value` up to a multiple of `align` (a power of two, or 0/1 for none).
#[must_use]
pub fn align_up(value: u64, align: u64) -> u64
{
    if align <= 1 {
        return value;
    }
    value.div_ceil(align) * align
}

/// Natural alignment assumed for a type of `size` bytes: the next power of
/// two, capped at the pointer size.
#[must_use]
pub fn natural_alignment(size: u64, pointer_size: u64) -> u64
{
    size.max(1).next_power_of_two().min(pointer_size.max(1))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_align_up()
    {
        assert_eq!(align_up(12, 8), 16);
        assert_eq!(align_up(16, 8), 16);
        assert_eq!(align_up(5, 1), 5);
    }

    #[test]
    fn test_natural_alignment()
    {
        assert_eq!(natural_alignment(4, 8), 4);
        assert_eq!(natural_alignment(24, 8), 8);
        assert_eq!(natural_alignment(3, 8), 4);
        assert_eq!(natural_alignment(0, 8), 1);
        assert_eq!(natural_alignment(8, 4), 4);
    }
}
