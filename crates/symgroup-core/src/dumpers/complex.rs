//! Synthetic children for expanded containers and smart pointers.
//!
//! Element values are created as additional symbols at the decoded
//! addresses; the container node gets reference children `0`, `1`, … (or
//! map entries) forwarding to them, and its engine children are marked
//! [`NodeFlags::OBSCURED`]. Collapsing the container frees the references
//! and with them the additional symbols.

use tracing::{debug, warn};

use super::simple::smart_pointer_member;
use super::typename::{is_pointer_type, strip_pointer};
use super::{known_type, KnownType};
use crate::containers::{self, Elements};
use crate::tree::{NodeFlags, NodeId};
use crate::types::Address;
use crate::value::{DumpContext, SymbolGroupValue};

/// Outcome of trying to build synthetic children.
enum Synthesis
{
    /// Children were inserted (possibly none for an empty container)
    Done,
    /// The dumper cannot handle this value; the engine children stay visible
    NotApplicable(String),
}

/// Insert synthetic children for `id` if the IDE expanded it and its type
/// has a complex dumper. Returns `true` if the node shows synthetic children.
///
/// Nodes only a dumper expanded are left alone. The outcome is cached on the
/// node until it is collapsed.
pub fn dump_complex(ctx: &mut DumpContext<'_>, id: NodeId) -> bool
{
    let id = ctx.group.resolve(id);
    let Some(real) = ctx.group.real(id) else {
        return false;
    };
    if !real.is_expanded() || real.flags.contains(NodeFlags::EXPANDED_BY_DUMPER) {
        return false;
    }
    if real.flags.contains(NodeFlags::COMPLEX_DUMPER_OK) {
        return true;
    }
    if real.flags.contains(NodeFlags::COMPLEX_DUMPER_NOT_APPLICABLE) {
        return false;
    }
    let pointer = is_pointer_type(&real.entry.type_name);

    let known = known_type(ctx, id);
    let outcome = if pointer || !known.has_complex_dumper() {
        Synthesis::NotApplicable(String::new())
    } else if known.is_smart_pointer() {
        smart_pointer_children(ctx, id, known)
    } else {
        container_children(ctx, id, known)
    };

    let path = ctx.group.absolute_iname(id);
    match outcome {
        Synthesis::Done => {
            obscure_engine_children(ctx, id);
            if let Some(real) = ctx.group.real_mut(id) {
                real.flags.insert(NodeFlags::COMPLEX_DUMPER_OK);
            }
            debug!("Synthetic children for {path} ({known:?})");
            true
        }
        Synthesis::NotApplicable(reason) => {
            if !reason.is_empty() {
                warn!("Complex dumper for {path} ({known:?}) not applicable: {reason}");
            }
            if let Some(real) = ctx.group.real_mut(id) {
                real.flags.insert(NodeFlags::COMPLEX_DUMPER_NOT_APPLICABLE);
            }
            false
        }
    }
}

fn obscure_engine_children(ctx: &mut DumpContext<'_>, id: NodeId)
{
    let children = ctx.group.children(id).to_vec();
    for child in children {
        if let Some(real) = ctx.group.node_mut(child).real_mut() {
            if !real.flags.contains(NodeFlags::ADDITIONAL_SYMBOL) {
                real.flags.insert(NodeFlags::OBSCURED);
            }
        }
    }
}

fn smart_pointer_children(ctx: &mut DumpContext<'_>, id: NodeId, known: KnownType) -> Synthesis
{
    let value = SymbolGroupValue::new(id);
    let pointer = smart_pointer_member(ctx, &value, known);
    if !pointer.is_valid() {
        return Synthesis::NotApplicable(pointer.error().to_string());
    }
    let address = pointer.pointer_value(ctx.group, 0);
    if address == 0 {
        return Synthesis::Done;
    }
    let pointer_type = pointer.type_name(ctx.group);
    let Some(pointee) = strip_pointer(&pointer_type) else {
        return Synthesis::NotApplicable(format!("{pointer_type} is not a pointer"));
    };
    let target = SymbolGroupValue::at_address(ctx, Address::new(address), pointee);
    let Some(target) = target.node() else {
        return Synthesis::NotApplicable(target.error().to_string());
    };
    ctx.group.add_reference(id, "data".to_string(), "data".to_string(), target);
    Synthesis::Done
}

fn container_children(ctx: &mut DumpContext<'_>, id: NodeId, known: KnownType) -> Synthesis
{
    let value = SymbolGroupValue::new(id);
    let size = match containers::size(ctx, &value, known) {
        Ok(size) => size,
        Err(e) => return Synthesis::NotApplicable(e.to_string()),
    };
    if size == 0 {
        return Synthesis::Done;
    }
    let elements = match containers::decode(ctx, &value, known) {
        Ok(elements) => elements,
        Err(e) => return Synthesis::NotApplicable(e.to_string()),
    };
    if elements.is_empty() {
        return Synthesis::NotApplicable(format!("no elements decoded of {size}"));
    }

    match elements {
        Elements::Sequence {
            element_type,
            addresses,
        } => {
            for (i, address) in addresses.into_iter().enumerate() {
                let element = SymbolGroupValue::at_address(ctx, address, &element_type);
                let (iname, name) = (i.to_string(), format!("[{i}]"));
                match element.node() {
                    Some(target) => {
                        ctx.group.add_reference(id, iname, name, target);
                    }
                    None => {
                        ctx.group.add_error_node(id, iname, name, element.error().to_string());
                    }
                }
            }
        }
        Elements::Map {
            key_type,
            value_type,
            entries,
        } => {
            for (i, (key_address, value_address)) in entries.into_iter().enumerate() {
                let key = SymbolGroupValue::at_address(ctx, key_address, &key_type);
                let mapped = SymbolGroupValue::at_address(ctx, value_address, &value_type);
                let (iname, name) = (i.to_string(), format!("[{i}]"));
                match (key.node(), mapped.node()) {
                    (Some(key), Some(mapped)) => {
                        ctx.group.add_map_entry(id, iname, name, key, mapped);
                    }
                    _ => {
                        let message = format!("{}{}", key.error(), mapped.error());
                        ctx.group.add_error_node(id, iname, name, message);
                    }
                }
            }
        }
    }
    Synthesis::Done
}
