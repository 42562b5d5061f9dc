//! Turning tree nodes into protocol [`ValueRecord`]s.
//!
//! A record for an expanded node carries its visible children, one level
//! deep. Nodes expanded only because a dumper navigated into them are
//! reported collapsed.

use symgroup_protocol::encoding::{is_plain_text, utf16_le_bytes};
use symgroup_protocol::{DisplayFormat, FormatMap, ValueEncoding, ValueRecord};

use super::typename::{is_aggregate_value, is_integral_type, is_pointer_type, is_primitive_type};
use super::{display_value, ensure_complex, known_type};
use crate::tree::{NodeFlags, NodeId, NodeKind};
use crate::value::{parse_int_text, DumpContext, SymbolGroupValue};

/// Value shown for variables not initialized at the current location.
pub const NOT_ACCESSIBLE: &str = "<not accessible>";

/// Records of `ids`, with children for expanded nodes.
pub fn records(ctx: &mut DumpContext<'_>, ids: &[NodeId], formats: &FormatMap) -> Vec<ValueRecord>
{
    ids.iter().map(|id| record(ctx, *id, formats, true)).collect()
}

/// Record of one node.
pub fn record(ctx: &mut DumpContext<'_>, id: NodeId, formats: &FormatMap, with_children: bool) -> ValueRecord
{
    let node = ctx.group.node(id);
    let mut record = ValueRecord {
        iname: ctx.group.absolute_iname(id),
        name: node.name.clone(),
        value_enabled: true,
        ..ValueRecord::default()
    };
    let target = ctx.group.resolve(id);
    match ctx.group.node(target).kind.clone() {
        NodeKind::Real(_) => fill_real(ctx, id, target, formats, &mut record),
        NodeKind::MapEntry => fill_map_entry(ctx, id, &mut record),
        NodeKind::Error(message) => {
            set_value(&mut record, message);
            record.value_enabled = false;
        }
        NodeKind::Root | NodeKind::Reference(_) | NodeKind::Detached => {}
    }
    if with_children && shows_children(ctx, target) {
        let children = ctx.group.visible_children(id);
        record.num_child = children.len();
        record.children = Some(children.into_iter().map(|child| record_of_child(ctx, child, formats)).collect());
    }
    record
}

fn record_of_child(ctx: &mut DumpContext<'_>, id: NodeId, formats: &FormatMap) -> ValueRecord
{
    record(ctx, id, formats, false)
}

/// Whether the IDE sees the node as expanded.
fn shows_children(ctx: &DumpContext<'_>, id: NodeId) -> bool
{
    match &ctx.group.node(id).kind {
        NodeKind::Real(real) => real.is_expanded() && !real.flags.contains(NodeFlags::EXPANDED_BY_DUMPER),
        NodeKind::MapEntry => true,
        _ => false,
    }
}

/// Store the display text, as base64 of its UTF-16 units unless it is
/// printable 7-bit text.
fn set_value(record: &mut ValueRecord, value: String)
{
    if is_plain_text(&value) {
        record.encoding = ValueEncoding::Plain;
        record.value = value;
    } else {
        let units: Vec<u16> = value.encode_utf16().collect();
        record.encoding = ValueEncoding::Base64Utf16;
        record.value = ValueEncoding::Base64Utf16.encode(&utf16_le_bytes(&units));
    }
}

/// Engine text of an enumerator: `Name (0n3)`.
fn is_enum_value(text: &str) -> bool
{
    !is_aggregate_value(text) && text.ends_with(')') && text.contains(" (") && parse_int_text(text).is_some()
}

fn fill_real(ctx: &mut DumpContext<'_>, id: NodeId, target: NodeId, formats: &FormatMap, record: &mut ValueRecord)
{
    let Some(real) = ctx.group.real(target) else {
        return;
    };
    let entry = real.entry.clone();
    let uninitialized = real.flags.contains(NodeFlags::UNINITIALIZED);
    let value = SymbolGroupValue::new(target);

    record.type_name = entry.type_name.clone();
    record.size = Some(entry.size);
    if let Some(address) = entry.address {
        record.exp = Some(address.typed_expression(&entry.type_name));
        if is_pointer_type(&entry.type_name) {
            record.address = value.object_address(ctx.group).map(u64::from);
            record.orig_address = Some(address.value());
        } else {
            record.address = Some(address.value());
        }
    }

    if uninitialized {
        set_value(record, NOT_ACCESSIBLE.to_string());
        record.num_child = 0;
        return;
    }

    let format = formats.lookup(&record.iname, &entry.type_name);
    let integer = is_integral_type(&entry.type_name)
        .then(|| parse_int_text(&entry.value_text))
        .flatten()
        .and_then(|v| format.format_integer(v, entry.size));
    let shown = match integer {
        Some(text) => text,
        None => display_value(ctx, target),
    };
    set_value(record, shown);

    let known = known_type(ctx, target);
    record.value_editable =
        is_primitive_type(&entry.type_name) || known.is_editable() || is_enum_value(&entry.value_text);

    let shown_expanded = shows_children(ctx, target);
    if shown_expanded {
        ensure_complex(ctx, target);
    }
    let Some(real) = ctx.group.real(target) else {
        return;
    };
    record.num_child = match real.dump.container_size {
        Some(size) if !shown_expanded => size,
        _ => ctx.group.child_count_hint(id),
    };
    if format == DisplayFormat::SeparateWindow {
        if let Some(raw) = &real.dump.raw {
            record.edit_value = Some((raw.encoding, raw.encoding.encode(&raw.bytes)));
        }
    }
}

/// `[key] value`, typed as the mapped value.
fn fill_map_entry(ctx: &mut DumpContext<'_>, id: NodeId, record: &mut ValueRecord)
{
    let children = ctx.group.children(id).to_vec();
    let [key, value] = children.as_slice() else {
        record.value_enabled = false;
        return;
    };
    let key_id = ctx.group.resolve(*key);
    let key_text = display_value(ctx, key_id);
    let value_id = ctx.group.resolve(*value);
    let value_text = display_value(ctx, value_id);
    record.type_name = SymbolGroupValue::new(value_id).type_name(ctx.group);
    set_value(record, format!("[{key_text}] {value_text}"));
    record.num_child = 2;
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_enum_value()
    {
        assert!(is_enum_value("Green (0n2)"));
        assert!(!is_enum_value("0n2"));
        assert!(!is_enum_value("class Foo"));
    }

    #[test]
    fn test_non_ascii_values_are_base64_encoded()
    {
        let mut record = ValueRecord::default();
        set_value(&mut record, "\"h\u{e9}\"".to_string());
        assert_eq!(record.encoding, ValueEncoding::Base64Utf16);
        assert_eq!(record.value, "IgBoAOkAIgA=");

        set_value(&mut record, "tab\there".to_string());
        assert_eq!(record.encoding, ValueEncoding::Base64Utf16);

        set_value(&mut record, "\"hi\"".to_string());
        assert_eq!(record.encoding, ValueEncoding::Plain);
        assert_eq!(record.value, "\"hi\"");
    }
}
