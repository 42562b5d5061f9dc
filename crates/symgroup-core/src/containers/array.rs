//! Contiguous storage: `std::vector`, `QVector`, `QList`.

use super::{non_null_member, pointer_member, required_member, ElementType};
use crate::dumpers::classify;
use crate::dumpers::strings::ArrayHeader;
use crate::dumpers::typename::is_primitive_type;
use crate::dumpers::KnownType;
use crate::engine::memory::align_up;
use crate::error::{Result, SymbolGroupError};
use crate::types::Address;
use crate::value::{DumpContext, SymbolGroupValue};

/// Header of a major-version-4 list: `ref`, `alloc`, `begin`, `end`,
/// `sharable`, then the pointer array.
fn qt4_list_array_offset(pointer_size: u64) -> u64
{
    align_up(20, pointer_size)
}

/// Major-version-5 lists keep the pointer array right after the four
/// 32-bit header fields.
const QT5_LIST_ARRAY_OFFSET: u64 = 16;

/// Major-version-4 vectors keep their elements after a 16-byte header.
const QT4_VECTOR_HEADER: u64 = 16;

fn vector_range(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue) -> Result<(Address, Address)>
{
    let first = pointer_member(ctx, value, "_Myfirst")?;
    let last = pointer_member(ctx, value, "_Mylast")?;
    if last < first {
        return Err(SymbolGroupError::Dumper(format!("vector range {first}..{last} reversed")));
    }
    Ok((first, last))
}

/// `(begin, end, array)` of a major-version-4/5 list.
fn list_header(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, major: u32) -> Result<(i64, i64, Address)>
{
    let d = non_null_member(ctx, value, "d")?;
    let begin = i64::from(ctx.read_i32(d + 8)?);
    let end = i64::from(ctx.read_i32(d + 12)?);
    let offset = if major == 4 {
        qt4_list_array_offset(ctx.pointer_size())
    } else {
        QT5_LIST_ARRAY_OFFSET
    };
    if end < begin {
        return Err(SymbolGroupError::Dumper(format!("list range {begin}..{end} reversed")));
    }
    Ok((begin, end, d + offset))
}

/// `(size, data)` of the `{d, ptr, size}` triple used by major version 6.
fn pointer_triple(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue) -> Result<(i64, Address)>
{
    let d = required_member(ctx, value, "d")?;
    let size = required_member(ctx, &d, "size")?;
    let ptr = required_member(ctx, &d, "ptr")?;
    Ok((size.int_value(ctx.group, -1), Address::new(ptr.pointer_value(ctx.group, 0))))
}

/// Element count.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] for missing members or unreadable headers.
pub fn size(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, known: KnownType) -> Result<i64>
{
    let major = ctx.library().major_version;
    match known {
        KnownType::StdVector => {
            let types = super::container_types(ctx, value, known)?;
            let (first, last) = vector_range(ctx, value)?;
            let bytes = last.offset_from(first).unwrap_or(0);
            Ok(i64::try_from(bytes / types.element.size).unwrap_or(-1))
        }
        _ if major >= 6 => Ok(pointer_triple(ctx, value)?.0),
        KnownType::QVector => {
            let d = non_null_member(ctx, value, "d")?;
            let offset = if major == 4 { 8 } else { 4 };
            Ok(i64::from(ctx.read_i32(d + offset)?))
        }
        _ => {
            let (begin, end, _) = list_header(ctx, value, major)?;
            Ok(end - begin)
        }
    }
}

/// Whether a list stores the element in its pointer slot instead of a
/// pointer to a heap copy.
#[must_use]
pub fn is_stored_inline(element: &ElementType, namespace: &str, pointer_size: u64) -> bool
{
    let movable = is_primitive_type(&element.name) || classify(&element.name, namespace, false).is_movable();
    movable && element.size <= pointer_size
}

/// Addresses of the first `count` elements.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] if the header cannot be read. Slot read
/// failures end the list early.
pub fn elements(
    ctx: &mut DumpContext<'_>,
    value: &SymbolGroupValue,
    known: KnownType,
    element: &ElementType,
    count: usize,
) -> Result<Vec<Address>>
{
    let library = ctx.library();
    let pointer_size = ctx.pointer_size();
    let contiguous = |data: Address| -> Vec<Address> {
        (0..count as u64).map(|i| data + i * element.size).collect()
    };
    match known {
        KnownType::StdVector => {
            let (first, _) = vector_range(ctx, value)?;
            Ok(contiguous(first))
        }
        _ if library.major_version >= 6 => {
            let (_, data) = pointer_triple(ctx, value)?;
            Ok(contiguous(data))
        }
        KnownType::QVector => {
            let d = non_null_member(ctx, value, "d")?;
            let data = if library.major_version == 4 {
                d + align_up(QT4_VECTOR_HEADER, element.alignment(pointer_size))
            } else {
                ArrayHeader::read(ctx, d)?.data(d)
            };
            Ok(contiguous(data))
        }
        _ => {
            let (begin, _, array) = list_header(ctx, value, library.major_version)?;
            let inline = is_stored_inline(element, &library.namespace, pointer_size);
            let first_slot = array + u64::try_from(begin).unwrap_or(0) * pointer_size;
            let mut addresses = Vec::with_capacity(count);
            for i in 0..count as u64 {
                let slot = first_slot + i * pointer_size;
                if inline {
                    addresses.push(slot);
                    continue;
                }
                match ctx.read_pointer(slot) {
                    Ok(address) if !address.is_null() => addresses.push(address),
                    _ => break,
                }
            }
            Ok(addresses)
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_qt4_list_array_offset()
    {
        assert_eq!(qt4_list_array_offset(8), 24);
        assert_eq!(qt4_list_array_offset(4), 20);
    }

    #[test]
    fn test_inline_storage()
    {
        let int = ElementType {
            name: "int".to_string(),
            size: 4,
        };
        let string = ElementType {
            name: "QString".to_string(),
            size: 8,
        };
        let big = ElementType {
            name: "Big".to_string(),
            size: 4,
        };
        assert!(is_stored_inline(&int, "", 8));
        assert!(is_stored_inline(&string, "", 8));
        assert!(!is_stored_inline(&string, "", 4));
        assert!(!is_stored_inline(&big, "", 8));
    }
}
