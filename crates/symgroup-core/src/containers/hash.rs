//! Chained hash tables: `QHash`, `QMultiHash`, `QSet` (major versions 4 and 5).
//!
//! The shared data block is `{fakeNext, buckets, ref, size, nodeSize,
//! userNumBits, numBits, numBuckets, ...}`. Each bucket holds a chain of
//! `{next, h, key, value}` nodes ending at the data block itself.

use tracing::debug;

use super::{required_member, ContainerTypes, Elements, ElementType};
use crate::dumpers::KnownType;
use crate::engine::memory::align_up;
use crate::error::{Result, SymbolGroupError};
use crate::types::Address;
use crate::value::{DumpContext, SymbolGroupValue};

/// Field offsets in the shared data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashLayout
{
    pub buckets: u64,
    pub size: u64,
    pub num_buckets: u64,
}

impl HashLayout
{
    #[must_use]
    pub fn for_pointer_size(pointer_size: u64) -> Self
    {
        Self {
            buckets: pointer_size,
            size: 2 * pointer_size + 4,
            num_buckets: 2 * pointer_size + 16,
        }
    }
}

/// Offset of the key in a node: after `next` and the 32-bit hash.
#[must_use]
pub fn key_offset(key: &ElementType, pointer_size: u64) -> u64
{
    align_up(pointer_size + 4, key.alignment(pointer_size))
}

/// Address of the shared data block.
fn hash_data(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, known: KnownType) -> Result<Address>
{
    let major = ctx.library().major_version;
    if major >= 6 {
        return Err(SymbolGroupError::Dumper(format!("hash layout of major version {major} not supported")));
    }
    let hash = if known == KnownType::QSet {
        required_member(ctx, value, "q_hash")?
    } else {
        value.clone()
    };
    let d = required_member(ctx, &hash, "d")?;
    match d.pointer_value(ctx.group, 0) {
        0 => Err(SymbolGroupError::Dumper("hash data is null".to_string())),
        d => Ok(Address::new(d)),
    }
}

/// Element count.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] for missing members or unsupported layouts.
pub fn size(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, known: KnownType) -> Result<i64>
{
    let d = hash_data(ctx, value, known)?;
    let layout = HashLayout::for_pointer_size(ctx.pointer_size());
    Ok(i64::from(ctx.read_i32(d + layout.size)?))
}

/// Node addresses in bucket order, at most `count`.
fn nodes(ctx: &DumpContext<'_>, d: Address, count: usize) -> Result<Vec<Address>>
{
    let pointer_size = ctx.pointer_size();
    let layout = HashLayout::for_pointer_size(pointer_size);
    let buckets = ctx.read_pointer(d + layout.buckets)?;
    let num_buckets = ctx.read_i32(d + layout.num_buckets)?;
    let num_buckets = u64::try_from(num_buckets)
        .map_err(|_| SymbolGroupError::Dumper(format!("corrupt bucket count {num_buckets}")))?;

    let mut nodes = Vec::with_capacity(count);
    'buckets: for bucket in 0..num_buckets {
        let mut node = match ctx.read_pointer(buckets + bucket * pointer_size) {
            Ok(node) => node,
            Err(e) => {
                debug!("hash walk stopped: {e}");
                break;
            }
        };
        while !node.is_null() && node != d {
            if nodes.len() == count {
                break 'buckets;
            }
            nodes.push(node);
            node = match ctx.read_pointer(node) {
                Ok(next) => next,
                Err(e) => {
                    debug!("hash chain broken: {e}");
                    break 'buckets;
                }
            };
        }
        if nodes.len() == count {
            break;
        }
    }
    Ok(nodes)
}

/// Decode up to `count` elements.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] if the data block cannot be read.
pub fn elements(
    ctx: &mut DumpContext<'_>,
    value: &SymbolGroupValue,
    known: KnownType,
    types: &ContainerTypes,
    count: usize,
) -> Result<Elements>
{
    let d = hash_data(ctx, value, known)?;
    let pointer_size = ctx.pointer_size();
    let key = &types.element;
    let key_at = key_offset(key, pointer_size);
    let nodes = nodes(ctx, d, count)?;
    Ok(match &types.mapped {
        Some(mapped) => {
            let value_at = align_up(key_at + key.size, mapped.alignment(pointer_size));
            Elements::Map {
                key_type: key.name.clone(),
                value_type: mapped.name.clone(),
                entries: nodes.into_iter().map(|node| (node + key_at, node + value_at)).collect(),
            }
        }
        None => Elements::Sequence {
            element_type: key.name.clone(),
            addresses: nodes.into_iter().map(|node| node + key_at).collect(),
        },
    })
}
