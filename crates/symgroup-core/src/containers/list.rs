//! Doubly linked list with a sentinel head node: `std::list`.
//!
//! Nodes are `{_Next, _Prev, _Myval}`; the head's `_Next` is the first
//! element and the last element links back to the head.

use tracing::debug;

use super::{non_null_member, required_member, ElementType};
use crate::engine::memory::align_up;
use crate::error::Result;
use crate::types::Address;
use crate::value::{DumpContext, SymbolGroupValue};

/// Offset of `_Myval` in a node.
#[must_use]
pub fn value_offset(element: &ElementType, pointer_size: u64) -> u64
{
    align_up(2 * pointer_size, element.alignment(pointer_size))
}

/// Element count from `_Mysize`.
///
/// ## Errors
///
/// [`crate::error::SymbolGroupError::Dumper`] if the member is missing.
pub fn size(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue) -> Result<i64>
{
    let size = required_member(ctx, value, "_Mysize")?;
    Ok(size.int_value(ctx.group, -1))
}

/// Addresses of the first `count` elements, following `_Next` links.
///
/// ## Errors
///
/// [`crate::error::SymbolGroupError::Dumper`] if the head is missing or
/// null. A broken link ends the list early.
pub fn elements(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, element: &ElementType, count: usize) -> Result<Vec<Address>>
{
    let head = non_null_member(ctx, value, "_Myhead")?;
    let offset = value_offset(element, ctx.pointer_size());
    let mut addresses = Vec::with_capacity(count);
    let mut node = head;
    while addresses.len() < count {
        node = match ctx.read_pointer(node) {
            Ok(next) => next,
            Err(e) => {
                debug!("list walk stopped: {e}");
                break;
            }
        };
        if node == head || node.is_null() {
            break;
        }
        addresses.push(node + offset);
    }
    Ok(addresses)
}
