//! Node types stored in the tree arena.

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::dumpers::KnownType;
use crate::engine::SymbolEntry;
use symgroup_protocol::ValueEncoding;

/// Handle of a node inside one [`SymbolGroup`](super::SymbolGroup).
///
/// Handles stay valid until the node is freed; freed slots are never reused
/// within a tree, so a stale handle resolves to a detached node instead of a
/// different variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

bitflags! {
    /// Cached state of a real node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u32 {
        const EXPANDED = 1 << 0;
        /// Variable not initialized at the current location
        const UNINITIALIZED = 1 << 1;
        const SIMPLE_DUMPER_OK = 1 << 2;
        const SIMPLE_DUMPER_FAILED = 1 << 3;
        const SIMPLE_DUMPER_NOT_APPLICABLE = 1 << 4;
        const COMPLEX_DUMPER_OK = 1 << 5;
        const COMPLEX_DUMPER_NOT_APPLICABLE = 1 << 6;
        /// Expanded implicitly while a dumper navigated members
        const EXPANDED_BY_DUMPER = 1 << 7;
        /// Synthetic symbol created by a cast; never listed
        const ADDITIONAL_SYMBOL = 1 << 8;
        /// Superseded by synthetic children of the parent
        const OBSCURED = 1 << 9;
        /// Top-level node of the watch tree
        const WATCH = 1 << 10;

        const SIMPLE_DUMPER_MASK = Self::SIMPLE_DUMPER_OK.bits()
            | Self::SIMPLE_DUMPER_FAILED.bits()
            | Self::SIMPLE_DUMPER_NOT_APPLICABLE.bits();
        const COMPLEX_DUMPER_MASK = Self::COMPLEX_DUMPER_OK.bits() | Self::COMPLEX_DUMPER_NOT_APPLICABLE.bits();
    }
}

/// Lossless copy of a dumped value for the separate-window display format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue
{
    pub encoding: ValueEncoding,
    pub bytes: Vec<u8>,
}

/// Output of the simple dumper, cached until the tree is discarded or the
/// node's type changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpState
{
    pub value: Option<String>,
    pub raw: Option<RawValue>,
    pub known_type: Option<KnownType>,
    pub container_size: Option<usize>,
}

/// A node bound to an index of the engine's symbol group.
#[derive(Debug, Clone)]
pub struct RealNode
{
    pub index: usize,
    pub flags: NodeFlags,
    pub entry: SymbolEntry,
    pub dump: DumpState,
}

impl RealNode
{
    #[must_use]
    pub fn new(index: usize, entry: SymbolEntry) -> Self
    {
        Self {
            index,
            flags: NodeFlags::empty(),
            entry,
            dump: DumpState::default(),
        }
    }

    #[must_use]
    pub fn is_expanded(&self) -> bool
    {
        self.flags.contains(NodeFlags::EXPANDED)
    }

    /// Forget inline dumper results (after a type change or assignment).
    /// Synthetic children stay until the node is collapsed.
    pub fn reset_dump(&mut self)
    {
        self.dump = DumpState::default();
        self.flags.remove(NodeFlags::SIMPLE_DUMPER_MASK);
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind
{
    Root,
    Real(RealNode),
    /// Forwards type, value and children to another node
    Reference(NodeId),
    /// Owns a `key` and a `value` reference child
    MapEntry,
    /// Placeholder for a watch expression that could not be evaluated
    Error(String),
    /// Freed slot
    Detached,
}

/// One node of a [`SymbolGroup`](super::SymbolGroup).
#[derive(Debug, Clone)]
pub struct Node
{
    /// Display name
    pub name: String,
    /// Path segment, unique among siblings
    pub iname: String,
    pub parent: Option<NodeId>,
    pub children: SmallVec<[NodeId; 8]>,
    pub kind: NodeKind,
}

impl Node
{
    pub(crate) fn new(name: String, iname: String, parent: Option<NodeId>, kind: NodeKind) -> Self
    {
        Self {
            name,
            iname,
            parent,
            children: SmallVec::new(),
            kind,
        }
    }

    #[must_use]
    pub fn real(&self) -> Option<&RealNode>
    {
        match &self.kind {
            NodeKind::Real(real) => Some(real),
            _ => None,
        }
    }

    pub(crate) fn real_mut(&mut self) -> Option<&mut RealNode>
    {
        match &mut self.kind {
            NodeKind::Real(real) => Some(real),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_detached(&self) -> bool
    {
        matches!(self.kind, NodeKind::Detached)
    }

    /// Flags of a real node, empty for every other kind.
    #[must_use]
    pub fn flags(&self) -> NodeFlags
    {
        self.real().map(|r| r.flags).unwrap_or_default()
    }
}
