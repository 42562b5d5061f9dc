//! Block-table deque: `std::deque` (and `std::stack` through its `c` member).
//!
//! `_Map` points to `_Mapsize` block pointers; element `i` lives in block
//! `((_Myoff + i) / B) % _Mapsize` at slot `(_Myoff + i) % B`, where the block
//! size `B` depends on the element size.

use tracing::debug;

use super::{non_null_member, required_member, ElementType};
use crate::dumpers::KnownType;
use crate::error::{Result, SymbolGroupError};
use crate::types::Address;
use crate::value::{DumpContext, SymbolGroupValue};

/// Elements per block for an element of `size` bytes.
#[must_use]
pub fn block_size(size: u64) -> u64
{
    match size {
        0..=1 => 16,
        2 => 8,
        3..=4 => 4,
        5..=8 => 2,
        _ => 1,
    }
}

/// The deque itself: the value, or the `c` member of a stack.
fn deque_value(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, known: KnownType) -> Result<SymbolGroupValue>
{
    if known == KnownType::StdStack {
        required_member(ctx, value, "c")
    } else {
        Ok(value.clone())
    }
}

/// Element count from `_Mysize`.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] if the member is missing.
pub fn size(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, known: KnownType) -> Result<i64>
{
    let deque = deque_value(ctx, value, known)?;
    let size = required_member(ctx, &deque, "_Mysize")?;
    Ok(size.int_value(ctx.group, -1))
}

/// Addresses of the first `count` elements.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] for a missing or empty block map. A missing
/// block ends the list early.
pub fn elements(
    ctx: &mut DumpContext<'_>,
    value: &SymbolGroupValue,
    known: KnownType,
    element: &ElementType,
    count: usize,
) -> Result<Vec<Address>>
{
    let deque = deque_value(ctx, value, known)?;
    let map = non_null_member(ctx, &deque, "_Map")?;
    let map_size = required_member(ctx, &deque, "_Mapsize")?.int_value(ctx.group, 0);
    let offset = required_member(ctx, &deque, "_Myoff")?.int_value(ctx.group, 0);
    let (Ok(map_size), Ok(offset)) = (u64::try_from(map_size), u64::try_from(offset)) else {
        return Err(SymbolGroupError::Dumper(format!("corrupt deque map ({map_size}, {offset})")));
    };
    if map_size == 0 {
        return Err(SymbolGroupError::Dumper("empty deque map".to_string()));
    }
    let pointer_size = ctx.pointer_size();
    let per_block = block_size(element.size);
    let mut addresses = Vec::with_capacity(count);
    for i in 0..count as u64 {
        let position = offset + i;
        let block_index = (position / per_block) % map_size;
        let block = match ctx.read_pointer(map + block_index * pointer_size) {
            Ok(block) if !block.is_null() => block,
            other => {
                debug!("deque block {block_index} unavailable: {other:?}");
                break;
            }
        };
        addresses.push(block + (position % per_block) * element.size);
    }
    Ok(addresses)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_block_size()
    {
        assert_eq!(block_size(1), 16);
        assert_eq!(block_size(2), 8);
        assert_eq!(block_size(4), 4);
        assert_eq!(block_size(8), 2);
        assert_eq!(block_size(24), 1);
    }
}
