//! Assigning new values to nodes.
//!
//! Scalars go through the engine's own assignment. Editable string types
//! are written directly: the new characters and terminator are stored in the
//! existing buffer and the size field is fixed up. If the buffer is too
//! small (or shared), the debuggee's `reserve` is called once through an
//! injected call before writing.

use tracing::{debug, info};

use symgroup_protocol::encoding::{decode_assign_text, decode_assign_value};
use symgroup_protocol::AssignEncoding;

use super::strings::{char_width, ArrayHeader};
use super::typename::{is_primitive_type, strip_keywords, strip_pointer};
use super::{known_type, KnownType};
use crate::engine::{self, memory};
use crate::error::{Result, SymbolGroupError};
use crate::tree::{NodeFlags, NodeId};
use crate::types::Address;
use crate::value::{parse_int_text, DumpContext, SymbolGroupValue};

/// Size of the inline buffer of `std::basic_string` in bytes.
const STD_STRING_BUFFER: u64 = 16;

/// Assign `value` (given in `encoding`) to the node `id`.
///
/// ## Errors
///
/// - [`SymbolGroupError::NotEditable`] for uninitialized nodes and types
///   without an assignment path
/// - [`SymbolGroupError::Assign`] if the new value cannot be stored
/// - [`SymbolGroupError::InjectedCall`] if growing a string buffer failed
pub fn assign(ctx: &mut DumpContext<'_>, id: NodeId, encoding: AssignEncoding, value: &str) -> Result<()>
{
    let id = ctx.group.resolve(id);
    let path = ctx.group.absolute_iname(id);
    let Some(real) = ctx.group.real(id) else {
        return Err(SymbolGroupError::NotEditable(path));
    };
    if real.flags.contains(NodeFlags::UNINITIALIZED) {
        return Err(SymbolGroupError::NotEditable(path));
    }
    let type_name = real.entry.type_name.clone();
    let value_text = real.entry.value_text.clone();
    let index = real.index;

    let known = known_type(ctx, id);
    match known {
        KnownType::QString | KnownType::QByteArray | KnownType::StdString | KnownType::StdWString => {
            let bytes = decode_assign_value(value, encoding, char_width(known))?;
            assign_string(ctx, id, known, &bytes)?;
        }
        _ if is_primitive_type(&type_name) || parse_int_text(&value_text).is_some() => {
            let text = decode_assign_text(value, encoding)?;
            ctx.group
                .backend_mut()
                .write_symbol(index, &text)
                .map_err(|e| SymbolGroupError::Assign(e.to_string()))?;
        }
        _ => return Err(SymbolGroupError::NotEditable(path)),
    }
    refresh_subtree(ctx, id)?;
    info!("Assigned {path}");
    Ok(())
}

/// Re-read a node and its materialised descendants after memory changed.
fn refresh_subtree(ctx: &mut DumpContext<'_>, id: NodeId) -> Result<()>
{
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        if ctx.group.node(current).real().is_some() {
            ctx.group.refresh(current)?;
        }
        stack.extend(ctx.group.node(current).children.iter().copied());
    }
    Ok(())
}

/// Name of the string class for the `reserve` call.
fn class_name(ctx: &DumpContext<'_>, value: &SymbolGroupValue) -> String
{
    let type_name = value.type_name(ctx.group);
    let type_name = strip_keywords(&type_name);
    strip_pointer(type_name).unwrap_or(type_name).to_string()
}

fn reserve(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, object: Address, chars: usize) -> Result<()>
{
    let expression = format!("(({} *){object})->reserve({chars})", class_name(ctx, value));
    engine::call_function(ctx.target, ctx.events, &expression)?;
    Ok(())
}

fn member_address(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, name: &str) -> Result<(Address, u64)>
{
    let member = value.find_member(ctx, name);
    if !member.is_valid() {
        return Err(SymbolGroupError::Assign(member.error().to_string()));
    }
    let address = member
        .address(ctx.group)
        .ok_or_else(|| SymbolGroupError::Assign(format!("{name} has no address")))?;
    Ok((address, member.size(ctx.group)))
}

fn write_characters(ctx: &mut DumpContext<'_>, data: Address, bytes: &[u8], width: usize) -> Result<()>
{
    let mut buffer = Vec::with_capacity(bytes.len() + width);
    buffer.extend_from_slice(bytes);
    buffer.resize(bytes.len() + width, 0);
    ctx.target.write_memory(data, &buffer)?;
    Ok(())
}

fn assign_string(ctx: &mut DumpContext<'_>, id: NodeId, known: KnownType, bytes: &[u8]) -> Result<()>
{
    let width = char_width(known).bytes();
    let chars = bytes.len() / width;
    let value = SymbolGroupValue::new(id);
    let object = value
        .object_address(ctx.group)
        .ok_or_else(|| SymbolGroupError::Assign("string has no address".to_string()))?;
    match known {
        KnownType::QString | KnownType::QByteArray => assign_library_string(ctx, &value, object, bytes, chars, width),
        _ => assign_std_string(ctx, &value, object, bytes, chars, width),
    }
}

fn assign_library_string(
    ctx: &mut DumpContext<'_>,
    value: &SymbolGroupValue,
    object: Address,
    bytes: &[u8],
    chars: usize,
    width: usize,
) -> Result<()>
{
    let major = ctx.library().major_version;
    if major != 5 {
        return Err(SymbolGroupError::Assign(format!(
            "strings of major version {major} cannot be assigned"
        )));
    }
    let (d_field, _) = member_address(ctx, value, "d")?;
    let mut d = ctx.read_pointer(d_field)?;
    let mut header = ArrayHeader::read(ctx, d)?;
    if !header.can_hold(chars) {
        debug!("String at {object} needs {chars} characters, alloc {}", header.alloc);
        reserve(ctx, value, object, chars)?;
        d = ctx.read_pointer(d_field)?;
        header = ArrayHeader::read(ctx, d)?;
        if !header.can_hold(chars) {
            return Err(SymbolGroupError::Assign(format!(
                "buffer still too small after reserve ({} < {chars})",
                header.alloc
            )));
        }
    }
    write_characters(ctx, header.data(d), bytes, width)?;
    memory::write_unsigned(ctx.target, d + 4, 4, chars as u64)?;
    Ok(())
}

fn assign_std_string(
    ctx: &mut DumpContext<'_>,
    value: &SymbolGroupValue,
    object: Address,
    bytes: &[u8],
    chars: usize,
    width: usize,
) -> Result<()>
{
    let (size_field, size_bytes) = member_address(ctx, value, "_Mysize")?;
    let (reserved_field, reserved_bytes) = member_address(ctx, value, "_Myres")?;
    let (buffer, _) = member_address(ctx, value, "_Bx")?;

    let mut reserved = ctx.read_unsigned(reserved_field, reserved_bytes)?;
    if reserved < chars as u64 {
        debug!("String at {object} needs {chars} characters, reserved {reserved}");
        reserve(ctx, value, object, chars)?;
        reserved = ctx.read_unsigned(reserved_field, reserved_bytes)?;
        if reserved < chars as u64 {
            return Err(SymbolGroupError::Assign(format!(
                "buffer still too small after reserve ({reserved} < {chars})"
            )));
        }
    }
    let inline_capacity = STD_STRING_BUFFER / width as u64;
    let data = if reserved < inline_capacity {
        buffer
    } else {
        ctx.read_pointer(buffer)?
    };
    write_characters(ctx, data, bytes, width)?;
    memory::write_unsigned(ctx.target, size_field, size_bytes, chars as u64)?;
    Ok(())
}
