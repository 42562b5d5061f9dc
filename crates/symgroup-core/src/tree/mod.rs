//! # Symbol-group tree
//!
//! A tree of nodes mirroring the engine's flat, index-addressed symbol group
//! for one context (a thread/frame pair or the watch list).
//!
//! ## Node kinds
//!
//! - **Real** nodes are bound to an engine index and cache their metadata,
//!   flags and dumper output.
//! - **Reference** nodes forward type, value and children to another node but
//!   carry their own name and path (synthetic container elements).
//! - **Map-entry** nodes own exactly a `key` and a `value` reference.
//! - **Error** nodes stand in for watch expressions that failed to evaluate.
//!
//! ## Index bookkeeping
//!
//! Expanding the engine entry at index `i` inserts `n` entries after it, so
//! every real node with an index past `i` moves up by `n`; collapsing and
//! removing move them down again. The shift is applied to every real node of
//! the arena, which includes real nodes that are only reachable through
//! references (additional symbols).
//!
//! Nodes live in an arena addressed by [`NodeId`]. Freed slots are marked
//! [`NodeKind::Detached`] and handed out again by later allocations, so a
//! [`NodeId`] must not be kept across a collapse or removal.

pub mod names;
pub mod node;
pub mod watch;

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, trace, warn};

pub use self::node::{DumpState, Node, NodeFlags, NodeId, NodeKind, RawValue, RealNode};
pub use self::watch::WatchSyncReport;
use crate::engine::{EngineError, SymbolEntry, SymbolGroupBackend};
use crate::error::{Result, SymbolGroupError};
use crate::types::FrameKey;

/// Root segment of a locals tree.
pub const LOCALS_ROOT: &str = "local";
/// Root segment of the watch tree.
pub const WATCH_ROOT: &str = "watch";

/// Hops followed when resolving reference chains.
const MAX_REFERENCE_DEPTH: usize = 32;

/// Context a tree is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeScope
{
    Locals
    {
        frame: FrameKey,
        /// Function executing in the frame when the tree was created
        function: String,
    },
    Watches,
}

/// Result of [`SymbolGroup::expand_list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandOutcome
{
    /// Number of paths expanded successfully
    pub expanded: usize,
    /// Concatenated error messages of the failed paths
    pub errors: String,
}

/// Tree over one engine symbol group.
pub struct SymbolGroup
{
    backend: Box<dyn SymbolGroupBackend>,
    nodes: Vec<Node>,
    /// Detached slots available for reuse
    free: Vec<NodeId>,
    root: NodeId,
    scope: TreeScope,
    additional_counter: usize,
}

impl std::fmt::Debug for SymbolGroup
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("SymbolGroup")
            .field("scope", &self.scope)
            .field("nodes", &self.live_nodes())
            .field("entries", &self.backend.count())
            .finish_non_exhaustive()
    }
}

impl SymbolGroup
{
    /// Build the locals tree of a frame. The top-level entries of the backend
    /// become the root's children.
    ///
    /// ## Errors
    ///
    /// Fails if the backend's entries cannot be read.
    pub fn create_locals(backend: Box<dyn SymbolGroupBackend>, frame: FrameKey, function: String) -> Result<Self>
    {
        let mut group = Self::with_root(backend, TreeScope::Locals { frame, function }, LOCALS_ROOT);
        let count = group.backend.count();
        let entries = group.backend.entries(0, count)?;
        let fixed = names::fix_names(entries.iter().map(|e| e.name.as_str()), true);
        for (index, (entry, name)) in entries.into_iter().zip(fixed).enumerate() {
            if entry.parameters.parent.is_some() {
                continue;
            }
            let id = group.alloc(Node::new(
                name.name,
                name.iname,
                Some(group.root),
                NodeKind::Real(RealNode::new(index, entry)),
            ));
            group.nodes[group.root.0].children.push(id);
        }
        debug!(
            "Created locals tree for thread {} frame {}: {} symbols",
            frame.thread.raw(),
            frame.frame,
            group.nodes[group.root.0].children.len()
        );
        Ok(group)
    }

    /// Build an empty watch tree.
    #[must_use]
    pub fn create_watches(backend: Box<dyn SymbolGroupBackend>) -> Self
    {
        Self::with_root(backend, TreeScope::Watches, WATCH_ROOT)
    }

    fn with_root(backend: Box<dyn SymbolGroupBackend>, scope: TreeScope, root_iname: &str) -> Self
    {
        Self {
            backend,
            nodes: vec![Node::new(String::new(), root_iname.to_string(), None, NodeKind::Root)],
            free: Vec::new(),
            root: NodeId(0),
            scope,
            additional_counter: 0,
        }
    }

    #[must_use]
    pub fn scope(&self) -> &TreeScope
    {
        &self.scope
    }

    #[must_use]
    pub fn root(&self) -> NodeId
    {
        self.root
    }

    #[must_use]
    pub fn root_iname(&self) -> &str
    {
        &self.nodes[self.root.0].iname
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node
    {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node
    {
        &mut self.nodes[id.0]
    }

    /// The real node behind `id` (references resolved).
    #[must_use]
    pub fn real(&self, id: NodeId) -> Option<&RealNode>
    {
        self.nodes[self.resolve(id).0].real()
    }

    pub(crate) fn real_mut(&mut self, id: NodeId) -> Option<&mut RealNode>
    {
        let id = self.resolve(id);
        self.nodes[id.0].real_mut()
    }

    #[must_use]
    pub fn backend(&self) -> &dyn SymbolGroupBackend
    {
        &*self.backend
    }

    pub(crate) fn backend_mut(&mut self) -> &mut dyn SymbolGroupBackend
    {
        &mut *self.backend
    }

    fn alloc(&mut self, node: Node) -> NodeId
    {
        if let Some(id) = self.free.pop() {
            self.nodes[id.0] = node;
            return id;
        }
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Number of arena slots, live or free.
    #[must_use]
    pub fn arena_len(&self) -> usize
    {
        self.nodes.len()
    }

    /// Number of live nodes, the root included.
    #[must_use]
    pub fn live_nodes(&self) -> usize
    {
        self.nodes.len() - self.free.len()
    }

    /// Follow reference nodes to the node they stand for.
    #[must_use]
    pub fn resolve(&self, id: NodeId) -> NodeId
    {
        let mut current = id;
        for _ in 0..MAX_REFERENCE_DEPTH {
            match self.nodes[current.0].kind {
                NodeKind::Reference(target) => current = target,
                _ => return current,
            }
        }
        current
    }

    /// Children of `id`, with references forwarding to their target's children.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId]
    {
        &self.nodes[self.resolve(id).0].children
    }

    /// Children that are shown to the IDE: additional symbols and children
    /// superseded by synthetic ones are skipped.
    #[must_use]
    pub fn visible_children(&self, id: NodeId) -> Vec<NodeId>
    {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| {
                let node = &self.nodes[child.0];
                !node.is_detached()
                    && !node
                        .flags()
                        .intersects(NodeFlags::ADDITIONAL_SYMBOL | NodeFlags::OBSCURED)
            })
            .collect()
    }

    /// Number of children to announce for a node: the visible children once
    /// expanded, otherwise the engine's sub-element hint.
    #[must_use]
    pub fn child_count_hint(&self, id: NodeId) -> usize
    {
        let resolved = self.resolve(id);
        match &self.nodes[resolved.0].kind {
            NodeKind::Real(real) if !real.is_expanded() => real.entry.parameters.sub_elements,
            _ => self.visible_children(id).len(),
        }
    }

    /// Dotted path of a node, starting with the root segment.
    #[must_use]
    pub fn absolute_iname(&self, id: NodeId) -> String
    {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id.0];
            segments.push(node.iname.as_str());
            current = node.parent;
        }
        segments.reverse();
        segments.join(".")
    }

    /// Exact lookup of a dotted path. The first segment must be the root's.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<NodeId>
    {
        let mut segments = path.split('.');
        if segments.next()? != self.root_iname() {
            return None;
        }
        let mut current = self.root;
        for segment in segments {
            current = self
                .children(current)
                .iter()
                .copied()
                .find(|child| {
                    let node = &self.nodes[child.0];
                    !node.is_detached() && node.iname == segment
                })?;
        }
        Some(current)
    }

    /// [`find`](Self::find) reporting a missing node as an error.
    ///
    /// ## Errors
    ///
    /// [`SymbolGroupError::NoSuchNode`] if no node has that path.
    pub fn find_node(&self, path: &str) -> Result<NodeId>
    {
        self.find(path)
            .ok_or_else(|| SymbolGroupError::NoSuchNode(path.to_string()))
    }

    /// Live top-level nodes in tree order (including additional symbols).
    #[must_use]
    pub fn top_level(&self) -> Vec<NodeId>
    {
        self.nodes[self.root.0].children.to_vec()
    }

    /// All live real nodes of the arena.
    pub fn real_nodes(&self) -> impl Iterator<Item = (NodeId, &RealNode)>
    {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| node.real().map(|real| (NodeId(i), real)))
    }

    #[must_use]
    pub fn is_expanded(&self, id: NodeId) -> bool
    {
        match &self.nodes[self.resolve(id).0].kind {
            NodeKind::Real(real) => real.is_expanded(),
            NodeKind::Root | NodeKind::MapEntry => true,
            _ => false,
        }
    }

    /// Expand a node on request of the IDE.
    ///
    /// Expanding an expanded node is a no-op. Root, map-entry and error
    /// nodes have nothing to expand.
    ///
    /// ## Errors
    ///
    /// [`SymbolGroupError::RefuseExpandUninitialized`] for uninitialized
    /// variables, engine errors otherwise. The tree is unchanged on error.
    pub fn expand(&mut self, id: NodeId) -> Result<()>
    {
        self.expand_impl(id)?;
        if let Some(real) = self.real_mut(id) {
            real.flags.remove(NodeFlags::EXPANDED_BY_DUMPER);
        }
        Ok(())
    }

    /// Expand a node while a dumper navigates into it.
    ///
    /// ## Errors
    ///
    /// As [`expand`](Self::expand).
    pub(crate) fn expand_for_dumper(&mut self, id: NodeId) -> Result<()>
    {
        if self.expand_impl(id)? {
            if let Some(real) = self.real_mut(id) {
                real.flags.insert(NodeFlags::EXPANDED_BY_DUMPER);
            }
        }
        Ok(())
    }

    /// Expand the node at `path`.
    ///
    /// ## Errors
    ///
    /// [`SymbolGroupError::NoSuchNode`] or the errors of [`expand`](Self::expand).
    pub fn expand_path(&mut self, path: &str) -> Result<()>
    {
        let id = self.find_node(path)?;
        self.expand(id)
    }

    /// Returns `true` if the node was newly expanded.
    fn expand_impl(&mut self, id: NodeId) -> Result<bool>
    {
        let id = self.resolve(id);
        let Some(real) = self.nodes[id.0].real() else {
            return Ok(false);
        };
        if real.flags.contains(NodeFlags::UNINITIALIZED) {
            return Err(SymbolGroupError::RefuseExpandUninitialized(self.absolute_iname(id)));
        }
        if real.is_expanded() {
            return Ok(false);
        }
        let index = real.index;

        let before = self.backend.count();
        self.backend.expand(index, true)?;
        let added = self.backend.count().saturating_sub(before);
        let entries = if added == 0 {
            Vec::new()
        } else {
            match self.backend.entries(index + 1, added) {
                Ok(entries) => entries,
                Err(e) => {
                    if let Err(undo) = self.backend.expand(index, false) {
                        warn!("Failed to undo expansion of index {index}: {undo}");
                    }
                    return Err(e.into());
                }
            }
        };

        self.shift_up(index + 1, added);
        let fixed = names::fix_names(entries.iter().map(|e| e.name.as_str()), false);
        for (offset, (entry, name)) in entries.into_iter().zip(fixed).enumerate() {
            let child = self.alloc(Node::new(
                name.name,
                name.iname,
                Some(id),
                NodeKind::Real(RealNode::new(index + 1 + offset, entry)),
            ));
            self.nodes[id.0].children.push(child);
        }
        if let Some(real) = self.nodes[id.0].real_mut() {
            real.flags.insert(NodeFlags::EXPANDED);
            real.entry.parameters.sub_elements = added;
        }
        debug!("Expanded {} at index {index}: {added} children", self.absolute_iname(id));
        Ok(true)
    }

    /// Collapse a node, freeing its children and synthetic children.
    ///
    /// ## Errors
    ///
    /// [`SymbolGroupError::CollapseRoot`] for the root, engine errors
    /// otherwise.
    pub fn collapse(&mut self, id: NodeId) -> Result<()>
    {
        let id = self.resolve(id);
        if id == self.root {
            return Err(SymbolGroupError::CollapseRoot);
        }
        let Some(real) = self.nodes[id.0].real() else {
            return Ok(());
        };
        if !real.is_expanded() {
            return Ok(());
        }
        let index = real.index;

        let before = self.backend.count();
        self.backend.expand(index, false)?;
        let removed = before.saturating_sub(self.backend.count());

        let children = std::mem::take(&mut self.nodes[id.0].children);
        let mut orphans = Vec::new();
        for child in children {
            self.free_subtree(child, &mut orphans);
        }
        self.shift_down(index + 1 + removed, removed);
        if let Some(real) = self.nodes[id.0].real_mut() {
            real.flags
                .remove(NodeFlags::EXPANDED | NodeFlags::EXPANDED_BY_DUMPER | NodeFlags::COMPLEX_DUMPER_MASK);
        }
        debug!("Collapsed {} at index {index}: {removed} entries", self.absolute_iname(id));
        self.remove_orphans(orphans);
        Ok(())
    }

    /// Collapse the node at `path`.
    ///
    /// ## Errors
    ///
    /// As [`collapse`](Self::collapse), plus [`SymbolGroupError::NoSuchNode`].
    pub fn collapse_path(&mut self, path: &str) -> Result<()>
    {
        let id = self.find_node(path)?;
        self.collapse(id)
    }

    /// Expand every prefix of every path, in ascending `(depth, path)` order.
    /// Paths may be given with or without the root segment.
    pub fn expand_list(&mut self, paths: &[String]) -> ExpandOutcome
    {
        let root = self.root_iname().to_string();
        let mut pending = BTreeSet::new();
        for path in paths {
            let path = path.trim();
            if path.is_empty() {
                continue;
            }
            let full = if path == root || path.starts_with(&format!("{root}.")) {
                path.to_string()
            } else {
                format!("{root}.{path}")
            };
            let segments: Vec<&str> = full.split('.').collect();
            for depth in 2..=segments.len() {
                pending.insert((depth, segments[..depth].join(".")));
            }
        }

        let mut outcome = ExpandOutcome::default();
        for (_, path) in pending {
            match self.expand_path(&path) {
                Ok(()) => outcome.expanded += 1,
                Err(e) => {
                    if !outcome.errors.is_empty() {
                        outcome.errors.push_str(", ");
                    }
                    outcome.errors.push_str(&e.to_string());
                }
            }
        }
        outcome
    }

    /// Remove a node. Real nodes are removed from the engine (shifting later
    /// indices); other nodes are simply detached.
    ///
    /// ## Errors
    ///
    /// [`SymbolGroupError::CollapseRoot`] for the root, engine errors
    /// otherwise.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()>
    {
        if id == self.root {
            return Err(SymbolGroupError::CollapseRoot);
        }
        let mut orphans = Vec::new();
        if let Some(real) = self.nodes[id.0].real() {
            let index = real.index;
            let before = self.backend.count();
            self.backend.remove_symbol(index)?;
            let removed = before.saturating_sub(self.backend.count());
            self.detach(id);
            self.free_subtree(id, &mut orphans);
            self.shift_down(index + removed, removed);
            debug!("Removed index {index} ({removed} entries)");
        } else {
            self.detach(id);
            self.free_subtree(id, &mut orphans);
        }
        self.remove_orphans(orphans);
        Ok(())
    }

    /// Remove the node at `path`.
    ///
    /// ## Errors
    ///
    /// As [`remove_node`](Self::remove_node), plus [`SymbolGroupError::NoSuchNode`].
    pub fn remove_path(&mut self, path: &str) -> Result<()>
    {
        let id = self.find_node(path)?;
        self.remove_node(id)
    }

    /// Evaluate `expression` into a hidden top-level node (used for casts by
    /// the dumpers).
    ///
    /// ## Errors
    ///
    /// Engine errors if the expression cannot be evaluated.
    pub fn add_symbol(&mut self, expression: &str) -> Result<NodeId>
    {
        let iname = format!("additional{}", self.additional_counter);
        self.additional_counter += 1;
        let id = self.append_symbol(expression, expression.to_string(), iname, NodeFlags::ADDITIONAL_SYMBOL)?;
        trace!("Added symbol '{expression}' as {}", self.absolute_iname(id));
        Ok(id)
    }

    /// Append an engine symbol as a child of the root.
    pub(crate) fn append_symbol(
        &mut self,
        expression: &str,
        name: String,
        iname: String,
        flags: NodeFlags,
    ) -> Result<NodeId>
    {
        let index = self.backend.add_symbol(expression)?;
        let entry = match self.fetch_entry(index) {
            Ok(entry) => entry,
            Err(e) => {
                if let Err(undo) = self.backend.remove_symbol(index) {
                    warn!("Failed to remove half-added symbol {index}: {undo}");
                }
                return Err(e);
            }
        };
        let mut real = RealNode::new(index, entry);
        real.flags = flags;
        let id = self.alloc(Node::new(name, iname, Some(self.root), NodeKind::Real(real)));
        self.nodes[self.root.0].children.push(id);
        Ok(id)
    }

    /// Add a reference child forwarding to `target`.
    pub fn add_reference(&mut self, parent: NodeId, iname: String, name: String, target: NodeId) -> NodeId
    {
        let id = self.alloc(Node::new(name, iname, Some(parent), NodeKind::Reference(target)));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Add a map-entry child with `key` and `value` references.
    pub fn add_map_entry(&mut self, parent: NodeId, iname: String, name: String, key: NodeId, value: NodeId) -> NodeId
    {
        let id = self.alloc(Node::new(name, iname, Some(parent), NodeKind::MapEntry));
        self.nodes[parent.0].children.push(id);
        self.add_reference(id, "key".to_string(), "key".to_string(), key);
        self.add_reference(id, "value".to_string(), "value".to_string(), value);
        id
    }

    /// Add a placeholder node carrying an error message.
    pub fn add_error_node(&mut self, parent: NodeId, iname: String, name: String, message: String) -> NodeId
    {
        let id = self.alloc(Node::new(name, iname, Some(parent), NodeKind::Error(message)));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Reinterpret an unexpanded node as `type_name`.
    ///
    /// ## Errors
    ///
    /// [`SymbolGroupError::CastExpandedNode`] if the node is expanded,
    /// engine errors if the type is unknown.
    pub fn type_cast(&mut self, id: NodeId, type_name: &str) -> Result<()>
    {
        let id = self.resolve(id);
        let Some(real) = self.nodes[id.0].real() else {
            return Err(SymbolGroupError::NotEditable(self.absolute_iname(id)));
        };
        if real.is_expanded() {
            return Err(SymbolGroupError::CastExpandedNode(self.absolute_iname(id)));
        }
        let index = real.index;
        self.backend.output_as_type(index, type_name)?;
        self.refresh(id)?;
        debug!("Cast {} to {type_name}", self.absolute_iname(id));
        Ok(())
    }

    /// Cast the node at `path`.
    ///
    /// ## Errors
    ///
    /// As [`type_cast`](Self::type_cast), plus [`SymbolGroupError::NoSuchNode`].
    pub fn type_cast_path(&mut self, path: &str, type_name: &str) -> Result<()>
    {
        let id = self.find_node(path)?;
        self.type_cast(id, type_name)
    }

    /// Re-read a real node's metadata from the engine and drop dumper results.
    ///
    /// ## Errors
    ///
    /// Engine errors if the entry cannot be read.
    pub fn refresh(&mut self, id: NodeId) -> Result<()>
    {
        let id = self.resolve(id);
        let Some(index) = self.nodes[id.0].real().map(|r| r.index) else {
            return Ok(());
        };
        let entry = self.fetch_entry(index)?;
        if let Some(real) = self.nodes[id.0].real_mut() {
            real.entry = entry;
            real.reset_dump();
        }
        Ok(())
    }

    /// Set the uninitialized flag on the top-level nodes listed in `inames`
    /// (absolute paths) and clear it on all others.
    pub fn mark_uninitialized(&mut self, inames: &[String])
    {
        let wanted: HashSet<&str> = inames.iter().map(String::as_str).collect();
        for id in self.top_level() {
            let path = self.absolute_iname(id);
            let uninitialized = wanted.contains(path.as_str());
            let expanded = self.nodes[id.0].real().is_some_and(RealNode::is_expanded);
            if uninitialized && expanded {
                if let Err(e) = self.collapse(id) {
                    warn!("Cannot collapse uninitialized {path}: {e}");
                }
            }
            if let Some(real) = self.nodes[id.0].real_mut() {
                real.flags.set(NodeFlags::UNINITIALIZED, uninitialized);
            }
        }
    }

    /// Check that every real node's index names the engine entry it was
    /// created for.
    ///
    /// ## Errors
    ///
    /// [`SymbolGroupError::Inconsistent`] describing the first mismatch.
    pub fn verify_indices(&self) -> Result<()>
    {
        let count = self.backend.count();
        let mut seen = HashSet::new();
        for (id, real) in self.real_nodes() {
            let path = self.absolute_iname(id);
            if !seen.insert(real.index) {
                return Err(SymbolGroupError::Inconsistent(format!(
                    "{path}: index {} used twice",
                    real.index
                )));
            }
            if real.index >= count {
                return Err(SymbolGroupError::Inconsistent(format!(
                    "{path}: index {} beyond {count} entries",
                    real.index
                )));
            }
            let entry = self.fetch_entry(real.index)?;
            if entry.name != real.entry.name || entry.type_name != real.entry.type_name {
                return Err(SymbolGroupError::Inconsistent(format!(
                    "{path}: index {} holds {} ({})",
                    real.index, entry.name, entry.type_name
                )));
            }
        }
        Ok(())
    }

    fn fetch_entry(&self, index: usize) -> Result<SymbolEntry>
    {
        self.backend
            .entries(index, 1)?
            .pop()
            .ok_or_else(|| EngineError::InvalidIndex(index).into())
    }

    /// Move every real node at or past `point` up by `count`.
    fn shift_up(&mut self, point: usize, count: usize)
    {
        if count == 0 {
            return;
        }
        trace!("Shifting indices >= {point} by +{count}");
        for node in &mut self.nodes {
            if let Some(real) = node.real_mut() {
                if real.index >= point {
                    real.index += count;
                }
            }
        }
    }

    /// Move every real node at or past `point` down by `count`.
    fn shift_down(&mut self, point: usize, count: usize)
    {
        if count == 0 {
            return;
        }
        trace!("Shifting indices >= {point} by -{count}");
        for node in &mut self.nodes {
            if let Some(real) = node.real_mut() {
                if real.index >= point {
                    real.index -= count;
                }
            }
        }
    }

    fn detach(&mut self, id: NodeId)
    {
        if let Some(parent) = self.nodes[id.0].parent {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }
    }

    /// Free a subtree, collecting additional symbols referenced from it.
    fn free_subtree(&mut self, id: NodeId, orphans: &mut Vec<NodeId>)
    {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current.0];
            stack.extend(node.children.drain(..));
            if let NodeKind::Reference(target) = node.kind {
                orphans.push(target);
            }
            if !node.is_detached() {
                node.kind = NodeKind::Detached;
                self.free.push(current);
            }
        }
    }

    /// Remove additional symbols that were only reachable through freed
    /// references.
    fn remove_orphans(&mut self, orphans: Vec<NodeId>)
    {
        for target in orphans {
            let node = &self.nodes[target.0];
            let additional = node.flags().contains(NodeFlags::ADDITIONAL_SYMBOL);
            if !additional || self.is_referenced(target) {
                continue;
            }
            if let Err(e) = self.remove_node(target) {
                warn!("Failed to remove additional symbol {}: {e}", self.absolute_iname(target));
            }
        }
    }

    fn is_referenced(&self, target: NodeId) -> bool
    {
        self.nodes
            .iter()
            .any(|node| matches!(node.kind, NodeKind::Reference(t) if t == target))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::engine::simulated::{SimulatedProcess, StructDef};
    use crate::engine::DebugTarget;
    use crate::types::ThreadId;

    fn locals() -> SymbolGroup
    {
        let mut process = SimulatedProcess::new(8);
        process.add_struct(StructDef::new_struct("Point", 8).with_field("x", "int", 0).with_field("y", "int", 4));
        let a = process.alloc_bytes(&[1, 0, 0, 0, 2, 0, 0, 0]);
        let b = process.alloc_bytes(&[3, 0, 0, 0, 4, 0, 0, 0]);
        process.add_frame(ThreadId(1), 0, "main", &[("a", "Point", a), ("b", "Point", b)]);
        let mut target = process.into_target();
        let backend = target.scope_group(ThreadId(1), 0).unwrap();
        let frame = FrameKey {
            thread: ThreadId(1),
            frame: 0,
        };
        SymbolGroup::create_locals(backend, frame, "main".to_string()).unwrap()
    }

    #[test]
    fn test_expand_shifts_later_nodes()
    {
        let mut group = locals();
        let b = group.find("local.b").unwrap();
        assert_eq!(group.real(b).unwrap().index, 1);
        group.expand_path("local.a").unwrap();
        assert_eq!(group.real(b).unwrap().index, 3);
        assert_eq!(group.real(group.find("local.a.y").unwrap()).unwrap().index, 2);
        group.verify_indices().unwrap();
    }

    #[test]
    fn test_collapse_restores_indices()
    {
        let mut group = locals();
        group.expand_path("local.a").unwrap();
        group.expand_path("local.b").unwrap();
        group.collapse_path("local.a").unwrap();
        assert!(group.find("local.a.x").is_none());
        assert_eq!(group.real(group.find("local.b").unwrap()).unwrap().index, 1);
        assert_eq!(group.real(group.find("local.b.x").unwrap()).unwrap().index, 2);
        group.verify_indices().unwrap();
    }

    #[test]
    fn test_expand_collapse_cycles_reuse_slots()
    {
        let mut group = locals();
        group.expand_path("local.a").unwrap();
        group.collapse_path("local.a").unwrap();
        let arena = group.arena_len();
        let live = group.live_nodes();
        for _ in 0..50 {
            group.expand_path("local.a").unwrap();
            group.expand_path("local.b").unwrap();
            group.collapse_path("local.b").unwrap();
            group.collapse_path("local.a").unwrap();
        }
        assert_eq!(group.live_nodes(), live);
        assert!(group.arena_len() <= arena + 2, "arena grew to {}", group.arena_len());

        group.expand_path("local.b").unwrap();
        assert_eq!(group.real(group.find("local.b.y").unwrap()).unwrap().index, 3);
        group.verify_indices().unwrap();
    }

    #[test]
    fn test_collapse_root_is_refused()
    {
        let mut group = locals();
        let root = group.root();
        assert!(matches!(group.collapse(root), Err(SymbolGroupError::CollapseRoot)));
    }

    #[test]
    fn test_uninitialized_refuses_expand()
    {
        let mut group = locals();
        group.mark_uninitialized(&["local.a".to_string()]);
        let err = group.expand_path("local.a").unwrap_err();
        assert_eq!(err.to_string(), "refusing to expand uninitialized node local.a");
    }

    #[test]
    fn test_absolute_iname()
    {
        let mut group = locals();
        group.expand_path("local.b").unwrap();
        let y = group.find("local.b.y").unwrap();
        assert_eq!(group.absolute_iname(y), "local.b.y");
        assert!(group.find("watch.b").is_none());
    }
}
