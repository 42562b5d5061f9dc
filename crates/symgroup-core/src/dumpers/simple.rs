//! Inline formatters, dispatched on the known type.

use super::typename::is_pointer_type;
use super::{display_value, qt, strings, KnownType, SimpleDump};
use crate::containers;
use crate::error::{Result, SymbolGroupError};
use crate::tree::NodeId;
use crate::value::{DumpContext, SymbolGroupValue};

/// Run the simple dumper for `known`. `Ok(None)` means no dumper applies.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] if the value's layout cannot be decoded.
pub fn dump(ctx: &mut DumpContext<'_>, id: NodeId, known: KnownType) -> Result<Option<SimpleDump>>
{
    let value = SymbolGroupValue::new(id);
    if is_pointer_type(&value.type_name(ctx.group)) && value.pointer_value(ctx.group, 0) == 0 {
        return Ok(Some(SimpleDump::text("0x0")));
    }
    match known {
        KnownType::QString | KnownType::QByteArray | KnownType::StdString | KnownType::StdWString => {
            strings::dump_string(ctx, &value, known).map(Some)
        }
        KnownType::QChar => dump_qchar(ctx, &value).map(Some),
        KnownType::QDate
        | KnownType::QTime
        | KnownType::QPoint
        | KnownType::QPointF
        | KnownType::QSize
        | KnownType::QSizeF
        | KnownType::QRect
        | KnownType::QRectF
        | KnownType::QLine
        | KnownType::QFlags
        | KnownType::QAtomicInt
        | KnownType::QObject => qt::dump(ctx, &value, known),
        KnownType::StdPair => dump_pair(ctx, &value).map(Some),
        known if known.is_container() => {
            let size = containers::size(ctx, &value, known)?;
            Ok(Some(SimpleDump::text(format!("<{size} items>")).with_size(size)))
        }
        known if known.is_smart_pointer() => dump_smart_pointer(ctx, &value, known).map(Some),
        _ => Ok(None),
    }
}

fn dump_qchar(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue) -> Result<SimpleDump>
{
    let ucs = value.member(ctx, "ucs");
    if !ucs.is_valid() {
        return Err(SymbolGroupError::Dumper(ucs.error().to_string()));
    }
    let code = ucs.int_value(ctx.group, 0);
    let shown = u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .filter(|c| !c.is_control())
        .map_or_else(|| "?".to_string(), |c| c.to_string());
    Ok(SimpleDump::text(format!("'{shown}' ({code})")))
}

fn dump_pair(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue) -> Result<SimpleDump>
{
    let first = value.member(ctx, "first");
    let second = value.member(ctx, "second");
    match (first.node(), second.node()) {
        (Some(first), Some(second)) => {
            let first = display_value(ctx, first);
            let second = display_value(ctx, second);
            Ok(SimpleDump::text(format!("({first}, {second})")))
        }
        _ => Err(SymbolGroupError::Dumper(format!("{}{}", first.error(), second.error()))),
    }
}

/// Member holding the raw pointer of a smart pointer.
#[must_use]
pub fn smart_pointer_member(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, known: KnownType) -> SymbolGroupValue
{
    let candidates: &[&str] = match known {
        KnownType::QSharedPointer | KnownType::QWeakPointer => &["value"],
        KnownType::QScopedPointer => &["d"],
        KnownType::QPointer => &["wp.value", "o"],
        KnownType::StdSharedPtr => &["_Ptr"],
        KnownType::StdUniquePtr => &["_Mypair._Myval2", "_Myptr"],
        _ => &[],
    };
    let mut last = SymbolGroupValue::invalid(format!("{known:?} is not a smart pointer"));
    for path in candidates {
        let member = if path.contains('.') {
            value.member_path(ctx, path)
        } else {
            value.find_member(ctx, path)
        };
        if member.is_valid() {
            return member;
        }
        last = member;
    }
    last
}

fn dump_smart_pointer(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, known: KnownType) -> Result<SimpleDump>
{
    let pointer = smart_pointer_member(ctx, value, known);
    if !pointer.is_valid() {
        return Err(SymbolGroupError::Dumper(pointer.error().to_string()));
    }
    Ok(match pointer.pointer_value(ctx.group, 0) {
        0 => SimpleDump::text("(null)"),
        address => SimpleDump::text(format!("0x{address:x}")),
    })
}
