//! # Dumpers
//!
//! Type-driven formatting of tree nodes.
//!
//! ## Pipeline
//!
//! 1. [`known_type`] classifies the node's type name (cached on the node).
//! 2. [`dump_simple`] runs the inline formatter for the known type: strings,
//!    dates, geometry, container sizes, smart pointers. Results and failures
//!    are cached on the node; on failure the engine's own text is shown.
//! 3. [`complex::dump_complex`] replaces the engine children of an expanded
//!    container or smart pointer with synthetic children and marks the engine
//!    children obscured.
//! 4. [`record`] turns nodes into protocol records.
//!
//! Editable types are assigned through [`assign`].

pub mod assign;
pub mod complex;
pub mod knowntype;
pub mod qt;
pub mod record;
pub mod simple;
pub mod strings;
pub mod typename;

use tracing::{trace, warn};

pub use self::knowntype::{classify, KnownType, KnownTypeFlags};
use crate::tree::{NodeFlags, NodeId, RawValue};
use crate::value::DumpContext;

/// Output of an inline formatter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimpleDump
{
    pub value: String,
    /// Complete value for the separate-window format
    pub raw: Option<RawValue>,
    /// Number of elements of a container
    pub container_size: Option<usize>,
}

impl SimpleDump
{
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self
    {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_raw(mut self, raw: RawValue) -> Self
    {
        self.raw = Some(raw);
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self
    {
        self.container_size = Some(size);
        self
    }
}

/// Known type of a node (pointers to known types classify as the pointee).
pub fn known_type(ctx: &mut DumpContext<'_>, id: NodeId) -> KnownType
{
    let Some(real) = ctx.group.real(id) else {
        return KnownType::Unknown;
    };
    if let Some(known) = real.dump.known_type {
        return known;
    }
    let type_name = real.entry.type_name.clone();
    let known = classify(&type_name, &ctx.library().namespace, true);
    if let Some(real) = ctx.group.real_mut(id) {
        real.dump.known_type = Some(known);
    }
    known
}

/// Inline value of a node from its simple dumper, `None` if no dumper
/// applies or the dumper failed. Cached on the node.
pub fn dump_simple(ctx: &mut DumpContext<'_>, id: NodeId) -> Option<String>
{
    let id = ctx.group.resolve(id);
    let real = ctx.group.real(id)?;
    if real.flags.contains(NodeFlags::SIMPLE_DUMPER_OK) {
        return real.dump.value.clone();
    }
    if real
        .flags
        .intersects(NodeFlags::SIMPLE_DUMPER_FAILED | NodeFlags::SIMPLE_DUMPER_NOT_APPLICABLE)
    {
        return None;
    }

    let known = known_type(ctx, id);
    let result = if known.has_simple_dumper() {
        simple::dump(ctx, id, known)
    } else {
        Ok(None)
    };
    let path = ctx.group.absolute_iname(id);
    let real = ctx.group.real_mut(id)?;
    match result {
        Ok(Some(dump)) => {
            trace!("Dumped {path} as {known:?}: {}", dump.value);
            real.flags.insert(NodeFlags::SIMPLE_DUMPER_OK);
            real.dump.value = Some(dump.value);
            real.dump.raw = dump.raw;
            real.dump.container_size = dump.container_size;
            real.dump.value.clone()
        }
        Ok(None) => {
            real.flags.insert(NodeFlags::SIMPLE_DUMPER_NOT_APPLICABLE);
            None
        }
        Err(e) => {
            warn!("Dumper for {path} ({known:?}) failed: {e}");
            real.flags.insert(NodeFlags::SIMPLE_DUMPER_FAILED);
            None
        }
    }
}

/// Value shown for a node: the dumper output or the cleaned-up engine text.
pub fn display_value(ctx: &mut DumpContext<'_>, id: NodeId) -> String
{
    if let Some(value) = dump_simple(ctx, id) {
        return value;
    }
    ctx.group
        .real(id)
        .map(|real| clean_value_text(&real.entry.value_text))
        .unwrap_or_default()
}

/// Run the complex dumper of a node if it is expanded and has one.
pub fn ensure_complex(ctx: &mut DumpContext<'_>, id: NodeId) -> bool
{
    complex::dump_complex(ctx, id)
}

/// Remove decoration from the engine's value text: `0n` prefixes and the
/// backtick in 64-bit hex values.
#[must_use]
pub fn clean_value_text(text: &str) -> String
{
    let mut cleaned = String::with_capacity(text.len());
    let mut rest = text;
    while !rest.is_empty() {
        let at_token = cleaned.is_empty() || cleaned.ends_with([' ', '(', '-']);
        if at_token {
            if let Some(after) = rest.strip_prefix("0n") {
                if after.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
                    rest = after;
                    continue;
                }
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c != '`' || !cleaned.starts_with("0x") {
                cleaned.push(c);
            }
        }
        rest = chars.as_str();
    }
    cleaned
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_clean_value_text()
    {
        assert_eq!(clean_value_text("0n42"), "42");
        assert_eq!(clean_value_text("0n-3"), "-3");
        assert_eq!(clean_value_text("Red (0n1)"), "Red (1)");
        assert_eq!(clean_value_text("0x00000000`00001000"), "0x0000000000001000");
        assert_eq!(clean_value_text("0n65 'A'"), "65 'A'");
        assert_eq!(clean_value_text("class Foo"), "class Foo");
    }
}
