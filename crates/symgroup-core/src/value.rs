//! # Value handles
//!
//! [`SymbolGroupValue`] is a cheap, clonable view on a tree node used by the
//! dumpers to navigate a variable: members, children, numeric values and
//! casts. Handles are created invalid when navigation fails and stay
//! invalid; every further step just carries the error along, so dumpers can
//! chain `member("d").member("size")` and check validity once at the end.
//!
//! All navigation happens through a [`DumpContext`], which bundles the tree
//! with the engine and session state a dumper may touch.

use tracing::trace;

use crate::cache::{LibraryInfo, SessionCache};
use crate::dumpers::typename::{is_aggregate_value, is_pointer_type};
use crate::engine::{memory, DebugTarget, EngineResult};
use crate::events::EventQueue;
use crate::tree::{NodeFlags, NodeId, SymbolGroup};
use crate::types::Address;
use symgroup_utils::DumpSettings;

/// Everything a dumper may use while formatting a node.
pub struct DumpContext<'a>
{
    pub group: &'a mut SymbolGroup,
    pub target: &'a mut dyn DebugTarget,
    pub events: &'a EventQueue,
    pub cache: &'a mut SessionCache,
    pub settings: &'a DumpSettings,
}

impl DumpContext<'_>
{
    /// Library information for the current session.
    #[must_use]
    pub fn library(&self) -> LibraryInfo
    {
        self.cache.library(&*self.target, self.settings).clone()
    }

    #[must_use]
    pub fn pointer_size(&self) -> u64
    {
        self.target.pointer_size()
    }

    /// Module-qualified spelling of a library type, or the name itself if
    /// the engine does not know it.
    pub fn qualified_type(&mut self, type_name: &str) -> String
    {
        let library = self.library();
        let name = library.qualify(type_name);
        self.cache
            .resolve_type(&*self.target, &name, library.core_module.as_deref())
            .unwrap_or(name)
    }

    /// Read debuggee memory.
    ///
    /// ## Errors
    ///
    /// Engine errors for inaccessible memory.
    pub fn read(&self, address: Address, len: usize) -> EngineResult<Vec<u8>>
    {
        self.target.read_memory(address, len)
    }

    /// Read an unsigned integer of `size` bytes.
    ///
    /// ## Errors
    ///
    /// Engine errors for inaccessible memory.
    pub fn read_unsigned(&self, address: Address, size: u64) -> EngineResult<u64>
    {
        memory::read_unsigned(&*self.target, address, size)
    }

    /// Read a 32-bit signed integer.
    ///
    /// ## Errors
    ///
    /// Engine errors for inaccessible memory.
    pub fn read_i32(&self, address: Address) -> EngineResult<i32>
    {
        memory::read_i32(&*self.target, address)
    }

    /// Read a pointer.
    ///
    /// ## Errors
    ///
    /// Engine errors for inaccessible memory.
    pub fn read_pointer(&self, address: Address) -> EngineResult<Address>
    {
        memory::read_pointer(&*self.target, address)
    }
}

/// View on one node; invalid handles carry the reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolGroupValue
{
    node: Option<NodeId>,
    error: Option<String>,
}

impl SymbolGroupValue
{
    #[must_use]
    pub fn new(node: NodeId) -> Self
    {
        Self {
            node: Some(node),
            error: None,
        }
    }

    #[must_use]
    pub fn invalid(error: impl Into<String>) -> Self
    {
        Self {
            node: None,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool
    {
        self.node.is_some()
    }

    #[must_use]
    pub fn node(&self) -> Option<NodeId>
    {
        self.node
    }

    /// Why the handle is invalid (empty for valid handles).
    #[must_use]
    pub fn error(&self) -> &str
    {
        self.error.as_deref().unwrap_or_default()
    }

    fn fail(&self, group: &SymbolGroup, what: &str) -> Self
    {
        match self.node {
            Some(node) => Self::invalid(format!("{}: {what}", group.absolute_iname(node))),
            None => Self::invalid(format!("{}; {what}", self.error())),
        }
    }

    #[must_use]
    pub fn name(&self, group: &SymbolGroup) -> String
    {
        self.node.map(|id| group.node(id).name.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn type_name(&self, group: &SymbolGroup) -> String
    {
        self.node
            .and_then(|id| group.real(id))
            .map(|real| real.entry.type_name.clone())
            .unwrap_or_default()
    }

    /// The engine's formatting of the value.
    #[must_use]
    pub fn value_text(&self, group: &SymbolGroup) -> String
    {
        self.node
            .and_then(|id| group.real(id))
            .map(|real| real.entry.value_text.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn address(&self, group: &SymbolGroup) -> Option<Address>
    {
        self.node.and_then(|id| group.real(id)).and_then(|real| real.entry.address)
    }

    #[must_use]
    pub fn size(&self, group: &SymbolGroup) -> u64
    {
        self.node.and_then(|id| group.real(id)).map_or(0, |real| real.entry.size)
    }

    /// Address of the object itself: the pointee for pointers.
    #[must_use]
    pub fn object_address(&self, group: &SymbolGroup) -> Option<Address>
    {
        if is_pointer_type(&self.type_name(group)) {
            match self.pointer_value(group, 0) {
                0 => None,
                value => Some(Address::new(value)),
            }
        } else {
            self.address(group)
        }
    }

    fn real_children(ctx: &mut DumpContext<'_>, node: NodeId) -> Option<Vec<NodeId>>
    {
        if let Err(e) = ctx.group.expand_for_dumper(node) {
            trace!("Cannot expand {}: {e}", ctx.group.absolute_iname(node));
            return None;
        }
        Some(
            ctx.group
                .children(node)
                .iter()
                .copied()
                .filter(|child| {
                    ctx.group.node(*child).real().is_some_and(|real| {
                        !real.flags.contains(NodeFlags::ADDITIONAL_SYMBOL)
                    })
                })
                .collect(),
        )
    }

    /// Number of engine children (expands the node).
    pub fn child_count(&self, ctx: &mut DumpContext<'_>) -> usize
    {
        self.node
            .and_then(|node| Self::real_children(ctx, node))
            .map_or(0, |children| children.len())
    }

    /// Direct member by engine name (expands the node).
    #[must_use]
    pub fn member(&self, ctx: &mut DumpContext<'_>, name: &str) -> Self
    {
        let Some(node) = self.node else {
            return self.fail(ctx.group, &format!("member {name}"));
        };
        let Some(children) = Self::real_children(ctx, node) else {
            return self.fail(ctx.group, &format!("cannot expand for member {name}"));
        };
        children
            .into_iter()
            .find(|child| ctx.group.real(*child).is_some_and(|real| real.entry.name == name))
            .map_or_else(|| self.fail(ctx.group, &format!("no member {name}")), Self::new)
    }

    /// Follow a dotted member chain, e.g. `"d.size"`.
    #[must_use]
    pub fn member_path(&self, ctx: &mut DumpContext<'_>, path: &str) -> Self
    {
        path.split('.').fold(self.clone(), |value, name| value.member(ctx, name))
    }

    /// The `index`th engine child (expands the node).
    #[must_use]
    pub fn child_at(&self, ctx: &mut DumpContext<'_>, index: usize) -> Self
    {
        let Some(node) = self.node else {
            return self.fail(ctx.group, &format!("child {index}"));
        };
        match Self::real_children(ctx, node).and_then(|children| children.get(index).copied()) {
            Some(child) => Self::new(child),
            None => self.fail(ctx.group, &format!("no child {index}")),
        }
    }

    /// Search a member in this value and, breadth first, in its base classes.
    #[must_use]
    pub fn find_member(&self, ctx: &mut DumpContext<'_>, name: &str) -> Self
    {
        let Some(node) = self.node else {
            return self.fail(ctx.group, &format!("member {name}"));
        };
        let mut queue = std::collections::VecDeque::from([node]);
        while let Some(current) = queue.pop_front() {
            let Some(children) = Self::real_children(ctx, current) else {
                continue;
            };
            for child in &children {
                if ctx.group.real(*child).is_some_and(|real| real.entry.name == name) {
                    return Self::new(*child);
                }
            }
            queue.extend(children.into_iter().filter(|child| {
                ctx.group
                    .real(*child)
                    .is_some_and(|real| is_aggregate_value(&real.entry.value_text))
            }));
        }
        self.fail(ctx.group, &format!("no member {name} in class hierarchy"))
    }

    #[must_use]
    pub fn int_value(&self, group: &SymbolGroup, default: i64) -> i64
    {
        parse_int_text(&self.value_text(group)).unwrap_or(default)
    }

    #[must_use]
    pub fn pointer_value(&self, group: &SymbolGroup, default: u64) -> u64
    {
        parse_pointer_text(&self.value_text(group)).unwrap_or(default)
    }

    #[must_use]
    pub fn float_value(&self, group: &SymbolGroup, default: f64) -> f64
    {
        parse_float_text(&self.value_text(group)).unwrap_or(default)
    }

    /// Reinterpret the object at this value's address as `type_name`.
    #[must_use]
    pub fn type_cast(&self, ctx: &mut DumpContext<'_>, type_name: &str) -> Self
    {
        match self.address(ctx.group) {
            Some(address) => Self::at_address(ctx, address, type_name),
            None => self.fail(ctx.group, &format!("cast to {type_name} without address")),
        }
    }

    /// Reinterpret the pointee of this pointer value as `type_name`.
    #[must_use]
    pub fn pointer_type_cast(&self, ctx: &mut DumpContext<'_>, type_name: &str) -> Self
    {
        match self.pointer_value(ctx.group, 0) {
            0 => self.fail(ctx.group, &format!("null pointer cast to {type_name}")),
            pointer => Self::at_address(ctx, Address::new(pointer), type_name),
        }
    }

    /// Create an additional symbol of `type_name` at `address`.
    #[must_use]
    pub fn at_address(ctx: &mut DumpContext<'_>, address: Address, type_name: &str) -> Self
    {
        let expression = address.typed_expression(type_name);
        match ctx.group.add_symbol(&expression) {
            Ok(node) => Self::new(node),
            Err(e) => Self::invalid(format!("{expression}: {e}")),
        }
    }
}

/// Strip annotations the engine appends to numbers: enum names
/// (`Red (0n1)`), characters (`0n65 'A'`) and strings (`0x1000 "abc"`).
fn numeric_token(text: &str) -> &str
{
    let text = text.trim();
    if let Some(inner) = text.strip_suffix(')').and_then(|t| t.rsplit_once(" (")).map(|(_, inner)| inner) {
        return inner.trim();
    }
    text.split_whitespace().next().unwrap_or_default()
}

/// Parse an integer as the engine prints it: `0n` decimal, `0x` hex with
/// backtick separators, plain decimal, `true`/`false`.
#[must_use]
pub fn parse_int_text(text: &str) -> Option<i64>
{
    let token = numeric_token(text);
    match token {
        "true" => return Some(1),
        "false" => return Some(0),
        _ => {}
    }
    let (negative, token) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let magnitude = if let Some(decimal) = token.strip_prefix("0n") {
        let (inner_negative, decimal) = match decimal.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, decimal),
        };
        let value = decimal.parse::<i64>().ok()?;
        if inner_negative {
            -value
        } else {
            value
        }
    } else if let Some(hex) = token.strip_prefix("0x") {
        #[allow(clippy::cast_possible_wrap)]
        let value = u64::from_str_radix(&hex.replace('`', ""), 16).ok()? as i64;
        value
    } else {
        token.parse::<i64>().ok()?
    };
    if negative {
        magnitude.checked_neg()
    } else {
        Some(magnitude)
    }
}

/// Parse a pointer value (`0x00000000`00401000`, optionally annotated).
#[must_use]
pub fn parse_pointer_text(text: &str) -> Option<u64>
{
    let token = text.split_whitespace().next()?;
    match token.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(&hex.replace('`', ""), 16).ok(),
        None => parse_int_text(token).and_then(|v| u64::try_from(v).ok()),
    }
}

/// Parse a floating point value; integers are accepted as well.
#[must_use]
pub fn parse_float_text(text: &str) -> Option<f64>
{
    let token = numeric_token(text);
    token.parse::<f64>().ok().or_else(|| {
        #[allow(clippy::cast_precision_loss)]
        parse_int_text(token).map(|v| v as f64)
    })
}
