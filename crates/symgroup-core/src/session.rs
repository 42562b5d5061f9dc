//! # Session
//!
//! Owns the engine, the cached trees and the session caches, and turns
//! commands into protocol [`Response`]s.
//!
//! ## Tree lifetime
//!
//! - The locals tree is bound to a (thread, frame) pair and the function
//!   running in it. A request for another frame discards it.
//! - The watch tree lives until the debuggee resumes.
//! - Engine events are drained before every command: a resume or the end
//!   of the session discards both trees, a module load (or the end of the
//!   session) resets the library caches.
//!
//! ## Commands
//!
//! | command | payload on success |
//! |---|---|
//! | [`locals`](Session::locals) | `locals=[…]` |
//! | [`watches`](Session::watches) | `watches=[…]` |
//! | [`expand`](Session::expand) | `expanded="N",errors="…"` |
//! | [`assign`](Session::assign), [`type_cast`](Session::type_cast), [`remove`](Session::remove), [`collapse`](Session::collapse) | the records of the affected scope |
//!
//! Failures produce an `N` response carrying the error text.

use tracing::{debug, info, warn};

use symgroup_protocol::{write_record_list, AssignEncoding, DumpRequest, GdbmiWriter, Response};
use symgroup_utils::DumpSettings;

use crate::cache::SessionCache;
use crate::dumpers::{assign, record};
use crate::engine::DebugTarget;
use crate::error::{Result, SymbolGroupError};
use crate::events::{DebuggerEvent, EventQueue};
use crate::tree::{SymbolGroup, TreeScope, WatchSyncReport, WATCH_ROOT};
use crate::types::{FrameKey, ThreadId};
use crate::value::DumpContext;

/// Which of the two trees a command works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope
{
    Locals,
    Watches,
}

impl Scope
{
    /// Scope of an iname: `watch.…` paths belong to the watch tree.
    #[must_use]
    pub fn of_path(path: &str) -> Self
    {
        if path == WATCH_ROOT || path.starts_with(&format!("{WATCH_ROOT}.")) {
            Self::Watches
        } else {
            Self::Locals
        }
    }

    const fn list_key(self) -> &'static str
    {
        match self {
            Self::Locals => "locals",
            Self::Watches => "watches",
        }
    }
}

/// State of one debugging session.
pub struct Session
{
    target: Box<dyn DebugTarget>,
    events: EventQueue,
    settings: DumpSettings,
    cache: SessionCache,
    locals: Option<SymbolGroup>,
    watches: Option<SymbolGroup>,
}

impl std::fmt::Debug for Session
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Session")
            .field("settings", &self.settings)
            .field("locals", &self.locals.as_ref().map(SymbolGroup::scope))
            .field("watches", &self.watches.is_some())
            .finish_non_exhaustive()
    }
}

impl Session
{
    #[must_use]
    pub fn new(target: Box<dyn DebugTarget>, events: EventQueue, settings: DumpSettings) -> Self
    {
        Self {
            target,
            events,
            settings,
            cache: SessionCache::new(),
            locals: None,
            watches: None,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &DumpSettings
    {
        &self.settings
    }

    #[must_use]
    pub fn target(&self) -> &dyn DebugTarget
    {
        &*self.target
    }

    /// The current locals tree, if one exists.
    #[must_use]
    pub fn locals_tree(&self) -> Option<&SymbolGroup>
    {
        self.locals.as_ref()
    }

    /// The current watch tree, if one exists.
    #[must_use]
    pub fn watch_tree(&self) -> Option<&SymbolGroup>
    {
        self.watches.as_ref()
    }

    /// Apply pending engine events.
    pub fn handle_events(&mut self)
    {
        for event in self.events.drain() {
            debug!("Event: {}", event.describe());
            match event {
                DebuggerEvent::TargetResumed => self.discard_trees(),
                DebuggerEvent::TargetStopped { .. } => {}
                DebuggerEvent::ModuleLoaded { .. } => self.cache.reset(),
                DebuggerEvent::SessionEnded => {
                    self.discard_trees();
                    self.cache.reset();
                }
            }
        }
    }

    fn discard_trees(&mut self)
    {
        let locals = self.locals.take();
        let watches = self.watches.take();
        if locals.is_some() || watches.is_some() {
            info!("Discarding symbol groups");
        }
    }

    fn frame_key(&self, request: &DumpRequest) -> FrameKey
    {
        FrameKey {
            thread: request.thread.map_or_else(|| self.target.current_thread(), ThreadId),
            frame: request.frame,
        }
    }

    /// Locals tree for the request's frame, created or replaced as needed.
    fn ensure_locals(&mut self, request: &DumpRequest) -> Result<()>
    {
        let key = self.frame_key(request);
        let function = self.target.frame_function(key.thread, key.frame)?;
        if let Some(tree) = &self.locals {
            if let TreeScope::Locals { frame, function: current } = tree.scope() {
                if *frame == key && *current == function {
                    return Ok(());
                }
            }
            info!("Frame changed, discarding locals of {:?}", tree.scope());
        }
        let backend = self.target.scope_group(key.thread, key.frame)?;
        self.locals = Some(SymbolGroup::create_locals(backend, key, function)?);
        Ok(())
    }

    fn ensure_watches(&mut self) -> Result<()>
    {
        if self.watches.is_none() {
            let backend = self.target.watch_group()?;
            self.watches = Some(SymbolGroup::create_watches(backend));
        }
        Ok(())
    }

    fn ensure(&mut self, scope: Scope, request: &DumpRequest) -> Result<()>
    {
        match scope {
            Scope::Locals => self.ensure_locals(request),
            Scope::Watches => self.ensure_watches(),
        }
    }

    /// Run `f` with a dump context over the tree of `scope`.
    fn with_context<R>(&mut self, scope: Scope, f: impl FnOnce(&mut DumpContext<'_>) -> Result<R>) -> Result<R>
    {
        let tree = match scope {
            Scope::Locals => self.locals.as_mut(),
            Scope::Watches => self.watches.as_mut(),
        };
        let group = tree.ok_or_else(|| SymbolGroupError::NoContext(scope.list_key().to_string()))?;
        let mut ctx = DumpContext {
            group,
            target: &mut *self.target,
            events: &self.events,
            cache: &mut self.cache,
            settings: &self.settings,
        };
        f(&mut ctx)
    }

    /// Records of a whole scope, or of the subtree named by `request.partial`.
    fn dump(&mut self, scope: Scope, request: &DumpRequest) -> Result<String>
    {
        self.with_context(scope, |ctx| {
            let ids = match &request.partial {
                Some(path) => vec![ctx.group.find_node(path)?],
                None => ctx.group.visible_children(ctx.group.root()),
            };
            let records = record::records(ctx, &ids, &request.formats);
            Ok(write_record_list(scope.list_key(), &records))
        })
    }

    fn respond(token: u32, command: &str, result: Result<String>) -> Response
    {
        match result {
            Ok(payload) => Response::success(token, command, payload),
            Err(e) => {
                warn!("{command} failed: {e}");
                Response::failure(token, command, e.to_string())
            }
        }
    }

    /// Dump the locals of a frame.
    pub fn locals(&mut self, token: u32, request: &DumpRequest) -> Response
    {
        self.handle_events();
        let result = self.locals_impl(request);
        Self::respond(token, "locals", result)
    }

    fn locals_impl(&mut self, request: &DumpRequest) -> Result<String>
    {
        self.ensure_locals(request)?;
        let tree = self
            .locals
            .as_mut()
            .ok_or_else(|| SymbolGroupError::NoContext("locals".to_string()))?;
        tree.mark_uninitialized(&request.uninitialized);
        let outcome = tree.expand_list(&request.expanded);
        if !outcome.errors.is_empty() {
            debug!("Expanded {} nodes, failures: {}", outcome.expanded, outcome.errors);
        }
        self.dump(Scope::Locals, request)
    }

    /// Synchronise the watch list with `watches` (iname, expression) and dump it.
    pub fn watches(&mut self, token: u32, watches: &[(String, String)], request: &DumpRequest) -> Response
    {
        self.handle_events();
        let result = self.watches_impl(watches, request);
        Self::respond(token, "watches", result)
    }

    fn watches_impl(&mut self, watches: &[(String, String)], request: &DumpRequest) -> Result<String>
    {
        self.ensure_watches()?;
        let tree = self
            .watches
            .as_mut()
            .ok_or_else(|| SymbolGroupError::NoContext("watches".to_string()))?;
        let WatchSyncReport { added, removed, failed } = tree.synchronize_watches(watches)?;
        debug!("Watches synchronised: {added} added, {removed} removed, {failed} failed");
        tree.expand_list(&request.expanded);
        self.dump(Scope::Watches, request)
    }

    /// Expand a list of inames and report the number of successes and the
    /// errors of the others.
    pub fn expand(&mut self, token: u32, paths: &[String], request: &DumpRequest) -> Response
    {
        self.handle_events();
        let result = self.expand_impl(paths, request);
        Self::respond(token, "expand", result)
    }

    fn expand_impl(&mut self, paths: &[String], request: &DumpRequest) -> Result<String>
    {
        let (watch_paths, local_paths): (Vec<String>, Vec<String>) =
            paths.iter().cloned().partition(|p| Scope::of_path(p) == Scope::Watches);
        let mut expanded = 0;
        let mut errors = Vec::new();
        for (scope, paths) in [(Scope::Locals, local_paths), (Scope::Watches, watch_paths)] {
            if paths.is_empty() {
                continue;
            }
            self.ensure(scope, request)?;
            let outcome = self.with_context(scope, |ctx| Ok(ctx.group.expand_list(&paths)))?;
            expanded += outcome.expanded;
            if !outcome.errors.is_empty() {
                errors.push(outcome.errors);
            }
        }
        let mut writer = GdbmiWriter::new();
        writer.field("expanded", expanded).field("errors", errors.join(", "));
        Ok(writer.finish())
    }

    /// Assign a value to the node at `path` and dump its scope again.
    pub fn assign(&mut self, token: u32, path: &str, encoding: AssignEncoding, value: &str, request: &DumpRequest) -> Response
    {
        self.handle_events();
        let scope = Scope::of_path(path);
        let result = self.ensure(scope, request).and_then(|()| {
            self.with_context(scope, |ctx| {
                let id = ctx.group.find_node(path)?;
                assign::assign(ctx, id, encoding, value)
            })?;
            self.dump(scope, request)
        });
        Self::respond(token, "assign", result)
    }

    /// Change the type of the unexpanded node at `path`.
    pub fn type_cast(&mut self, token: u32, path: &str, type_name: &str, request: &DumpRequest) -> Response
    {
        self.handle_events();
        let scope = Scope::of_path(path);
        let result = self.ensure(scope, request).and_then(|()| {
            self.with_context(scope, |ctx| ctx.group.type_cast_path(path, type_name))?;
            self.dump(scope, request)
        });
        Self::respond(token, "typecast", result)
    }

    /// Remove the node at `path` from its tree.
    pub fn remove(&mut self, token: u32, path: &str, request: &DumpRequest) -> Response
    {
        self.handle_events();
        let scope = Scope::of_path(path);
        let result = self.ensure(scope, request).and_then(|()| {
            self.with_context(scope, |ctx| ctx.group.remove_path(path))?;
            self.dump(scope, request)
        });
        Self::respond(token, "remove", result)
    }

    /// Collapse the node at `path`.
    pub fn collapse(&mut self, token: u32, path: &str, request: &DumpRequest) -> Response
    {
        self.handle_events();
        let scope = Scope::of_path(path);
        let result = self.ensure(scope, request).and_then(|()| {
            self.with_context(scope, |ctx| ctx.group.collapse_path(path))?;
            self.dump(scope, request)
        });
        Self::respond(token, "collapse", result)
    }

    /// Wire lines for a response, chunked with the configured size.
    #[must_use]
    pub fn lines(&self, response: &Response) -> Vec<String>
    {
        response.to_lines(self.settings.chunk_size)
    }
}
