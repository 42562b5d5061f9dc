//! Red-black trees: `std::map`/`std::set` (and their multi variants) and
//! `QMap`/`QMultiMap` of major version 5.
//!
//! Both are walked in order with an explicit stack. The standard library
//! tree terminates at its head node (leaves point back to it); the library
//! map terminates at null.

use std::collections::HashSet;

use tracing::debug;

use super::{non_null_member, required_member, ContainerTypes, Elements, ElementType};
use crate::dumpers::KnownType;
use crate::engine::memory::align_up;
use crate::error::{Result, SymbolGroupError};
use crate::types::Address;
use crate::value::{DumpContext, SymbolGroupValue};

/// Offsets of the child links in a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLinks
{
    pub left: u64,
    pub right: u64,
}

impl TreeLinks
{
    /// `{_Left, _Parent, _Right, _Color, _Isnil, _Myval}`
    #[must_use]
    pub fn std_tree(pointer_size: u64) -> Self
    {
        Self {
            left: 0,
            right: 2 * pointer_size,
        }
    }

    /// `{p, left, right, key, value}`
    #[must_use]
    pub fn library_map(pointer_size: u64) -> Self
    {
        Self {
            left: pointer_size,
            right: 2 * pointer_size,
        }
    }
}

/// Lazily read view of a tree in debuggee memory, iterated in order.
///
/// Links are read on demand; a node seen twice (a corrupted, cyclic tree)
/// or an unreadable link ends the iteration.
pub struct ShadowTree<'c, 'a>
{
    ctx: &'c DumpContext<'a>,
    links: TreeLinks,
    sentinel: Address,
    stack: Vec<Address>,
    visited: HashSet<u64>,
    failed: bool,
}

impl<'c, 'a> ShadowTree<'c, 'a>
{
    /// Start an in-order walk at `root`. Null and `sentinel` end a path.
    #[must_use]
    pub fn new(ctx: &'c DumpContext<'a>, root: Address, links: TreeLinks, sentinel: Address) -> Self
    {
        let mut tree = Self {
            ctx,
            links,
            sentinel,
            stack: Vec::new(),
            visited: HashSet::new(),
            failed: false,
        };
        tree.push_left_spine(root);
        tree
    }

    fn is_leaf(&self, node: Address) -> bool
    {
        node.is_null() || node == self.sentinel
    }

    fn read_link(&mut self, node: Address, offset: u64) -> Address
    {
        match self.ctx.read_pointer(node + offset) {
            Ok(next) => next,
            Err(e) => {
                debug!("tree walk stopped: {e}");
                self.failed = true;
                Address::NULL
            }
        }
    }

    fn push_left_spine(&mut self, mut node: Address)
    {
        while !self.failed && !self.is_leaf(node) {
            if !self.visited.insert(node.value()) {
                debug!("tree walk stopped: node {node} seen twice");
                self.failed = true;
                return;
            }
            self.stack.push(node);
            node = self.read_link(node, self.links.left);
        }
    }
}

impl Iterator for ShadowTree<'_, '_>
{
    type Item = Address;

    fn next(&mut self) -> Option<Address>
    {
        if self.failed {
            return None;
        }
        let node = self.stack.pop()?;
        let right = self.read_link(node, self.links.right);
        self.push_left_spine(right);
        Some(node)
    }
}

fn is_library_map(known: KnownType) -> bool
{
    matches!(known, KnownType::QMap | KnownType::QMultiMap)
}

/// Element count.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] for missing members or unsupported layouts.
pub fn size(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, known: KnownType) -> Result<i64>
{
    if is_library_map(known) {
        let d = library_map_data(ctx, value)?;
        return Ok(i64::from(ctx.read_i32(d + 4)?));
    }
    let size = required_member(ctx, value, "_Mysize")?;
    Ok(size.int_value(ctx.group, -1))
}

fn library_map_data(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue) -> Result<Address>
{
    let major = ctx.library().major_version;
    if major != 5 {
        return Err(SymbolGroupError::Dumper(format!("map layout of major version {major} not supported")));
    }
    non_null_member(ctx, value, "d")
}

/// Offset of the value following a key of type `key`, starting at `key_offset`.
fn mapped_offset(key_offset: u64, key: &ElementType, mapped: &ElementType, pointer_size: u64) -> u64
{
    align_up(key_offset + key.size, mapped.alignment(pointer_size))
}

/// Decode up to `count` elements.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] if the tree header cannot be read.
pub fn elements(
    ctx: &mut DumpContext<'_>,
    value: &SymbolGroupValue,
    known: KnownType,
    types: &ContainerTypes,
    count: usize,
) -> Result<Elements>
{
    let pointer_size = ctx.pointer_size();
    let key = &types.element;
    let (root, links, sentinel, key_offset) = if is_library_map(known) {
        let d = library_map_data(ctx, value)?;
        // header node at d + 8, its left link is the root
        let header = d + 8;
        let root = ctx.read_pointer(header + pointer_size)?;
        let key_offset = align_up(3 * pointer_size, key.alignment(pointer_size));
        (root, TreeLinks::library_map(pointer_size), Address::NULL, key_offset)
    } else {
        let head = non_null_member(ctx, value, "_Myhead")?;
        let root = ctx.read_pointer(head + pointer_size)?;
        let key_offset = align_up(3 * pointer_size + 2, key.alignment(pointer_size));
        (root, TreeLinks::std_tree(pointer_size), head, key_offset)
    };

    let nodes: Vec<Address> = ShadowTree::new(ctx, root, links, sentinel).take(count).collect();
    Ok(match &types.mapped {
        Some(mapped) => {
            let value_offset = mapped_offset(key_offset, key, mapped, pointer_size);
            Elements::Map {
                key_type: key.name.clone(),
                value_type: mapped.name.clone(),
                entries: nodes
                    .into_iter()
                    .map(|node| (node + key_offset, node + value_offset))
                    .collect(),
            }
        }
        None => Elements::Sequence {
            element_type: key.name.clone(),
            addresses: nodes.into_iter().map(|node| node + key_offset).collect(),
        },
    })
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_links()
    {
        assert_eq!(TreeLinks::std_tree(8), TreeLinks { left: 0, right: 16 });
        assert_eq!(TreeLinks::library_map(4), TreeLinks { left: 4, right: 8 });
    }

    #[test]
    fn test_mapped_offset()
    {
        let int = ElementType {
            name: "int".to_string(),
            size: 4,
        };
        let double = ElementType {
            name: "double".to_string(),
            size: 8,
        };
        assert_eq!(mapped_offset(24, &int, &double, 8), 32);
        assert_eq!(mapped_offset(24, &int, &int, 8), 28);
    }
}
