//! # Engine facade
//!
//! Everything the tree and the dumpers need from the debugger engine, split in
//! two traits:
//!
//! - [`DebugTarget`]: memory, type metadata, modules, injected calls and the
//!   factory for symbol groups
//! - [`SymbolGroupBackend`]: the engine's index-addressed, mutable array of
//!   variable bindings for one scope
//!
//! ## Symbol group model
//!
//! A symbol group is a flat array. Expanding the entry at index `i` inserts its
//! direct children at `i + 1 ..= i + n`, shifting every later entry up by `n`;
//! collapsing removes all descendants again. Added symbols are appended at the
//! end. The tree in [`crate::tree`] mirrors this array and keeps its cached
//! indices in sync.
//!
//! All operations are synchronous and report failure as an [`EngineError`]
//! carrying a message. Nothing in here panics on bad input.

pub mod call;
pub mod memory;
pub mod simulated;

use bitflags::bitflags;
use thiserror::Error;

use crate::types::{Address, ThreadId};

/// Errors reported by an engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError
{
    /// Memory could not be read
    #[error("Cannot read {len} bytes at {address}")]
    MemoryAccess
    {
        address: Address,
        len: usize,
    },

    /// Memory could not be written
    #[error("Cannot write {len} bytes at {address}")]
    MemoryWrite
    {
        address: Address,
        len: usize,
    },

    /// A symbol index outside the symbol group
    #[error("Invalid symbol index {0}")]
    InvalidIndex(usize),

    /// An expression or name did not match any symbol
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// A type name could not be resolved
    #[error("Type not found: {0}")]
    TypeNotFound(String),

    /// No such stack frame
    #[error("No frame {frame} in thread {}", .thread.raw())]
    FrameNotFound
    {
        thread: ThreadId,
        frame: u32,
    },

    /// A value could not be parsed or stored
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The operation is not supported for this symbol
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Convenience alias for engine results.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Outcome of a failed injected call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError
{
    /// The debuggee raised an exception while running the call
    #[error("call crashed: {0}")]
    Crashed(String),
    /// The engine could not run the call
    #[error("call failed: {0}")]
    Failed(String),
}

bitflags! {
    /// Per-entry flags reported by the engine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SymbolFlags: u32 {
        /// The entry's children are present in the array
        const EXPANDED = 1 << 0;
        /// The entry cannot be written
        const READ_ONLY = 1 << 1;
    }
}

/// Structural parameters of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SymbolParameters
{
    /// Index of the parent entry, `None` for top-level entries
    pub parent: Option<usize>,
    /// Number of children the entry would get when expanded
    pub sub_elements: usize,
    pub flags: SymbolFlags,
}

/// Metadata of one symbol-group entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymbolEntry
{
    /// Name as the engine reports it (may be empty)
    pub name: String,
    pub type_name: String,
    /// Location of the value, `None` for register or synthetic values
    pub address: Option<Address>,
    pub size: u64,
    /// The engine's own formatting of the value
    pub value_text: String,
    pub parameters: SymbolParameters,
}

/// The engine's index-addressed symbol array for one scope.
pub trait SymbolGroupBackend
{
    /// Number of entries currently in the array.
    fn count(&self) -> usize;

    /// Metadata for `count` entries starting at `start`.
    ///
    /// ## Errors
    ///
    /// Fails if the range exceeds the array.
    fn entries(&self, start: usize, count: usize) -> EngineResult<Vec<SymbolEntry>>;

    /// Expand (insert children after `index`) or collapse (remove all
    /// descendants) an entry. Expanding an expanded entry is a no-op.
    ///
    /// ## Errors
    ///
    /// Fails for invalid indices or if the children cannot be materialised.
    fn expand(&mut self, index: usize, expand: bool) -> EngineResult<()>;

    /// Evaluate `expression` and append the result as a new top-level entry.
    ///
    /// ## Errors
    ///
    /// Fails if the expression cannot be evaluated.
    fn add_symbol(&mut self, expression: &str) -> EngineResult<usize>;

    /// Remove an entry together with its descendants.
    ///
    /// ## Errors
    ///
    /// Fails for invalid indices.
    fn remove_symbol(&mut self, index: usize) -> EngineResult<()>;

    /// Assign a new value given as expression text.
    ///
    /// ## Errors
    ///
    /// Fails if the value cannot be parsed or the memory cannot be written.
    fn write_symbol(&mut self, index: usize, value: &str) -> EngineResult<()>;

    /// Reinterpret an unexpanded entry as another type.
    ///
    /// ## Errors
    ///
    /// Fails if the type is unknown or the entry is expanded.
    fn output_as_type(&mut self, index: usize, type_name: &str) -> EngineResult<()>;
}

/// Memory, type metadata and control services of the debugger engine.
pub trait DebugTarget
{
    /// Read `len` bytes of debuggee memory.
    ///
    /// ## Errors
    ///
    /// [`EngineError::MemoryAccess`] if any byte is inaccessible.
    fn read_memory(&self, address: Address, len: usize) -> EngineResult<Vec<u8>>;

    /// Write debuggee memory.
    ///
    /// ## Errors
    ///
    /// [`EngineError::MemoryWrite`] if any byte is inaccessible.
    fn write_memory(&mut self, address: Address, bytes: &[u8]) -> EngineResult<()>;

    /// Size of a type in bytes, 0 if unknown.
    fn type_size(&self, type_name: &str) -> u64;

    /// Byte offset of a member, `None` if the type or member is unknown.
    fn field_offset(&self, type_name: &str, field: &str) -> Option<u64>;

    /// Resolve a type name to its module-qualified form (`module!Type`).
    ///
    /// ## Errors
    ///
    /// [`EngineError::TypeNotFound`] if no module defines the type.
    fn resolve_type(&self, name: &str, module: Option<&str>) -> EngineResult<String>;

    /// Pointer size of the debuggee (4 or 8).
    fn pointer_size(&self) -> u64;

    /// Names of the loaded modules.
    fn modules(&self) -> Vec<String>;

    /// Thread the engine currently considers active.
    fn current_thread(&self) -> ThreadId;

    /// Name of the function executing in a frame.
    ///
    /// ## Errors
    ///
    /// [`EngineError::FrameNotFound`] if the frame does not exist.
    fn frame_function(&self, thread: ThreadId, frame: u32) -> EngineResult<String>;

    /// Create the symbol group holding the locals of a frame.
    ///
    /// ## Errors
    ///
    /// [`EngineError::FrameNotFound`] if the frame does not exist.
    fn scope_group(&mut self, thread: ThreadId, frame: u32) -> EngineResult<Box<dyn SymbolGroupBackend>>;

    /// Create an empty, unscoped symbol group for watch expressions.
    ///
    /// ## Errors
    ///
    /// Fails if the engine cannot create symbol groups.
    fn watch_group(&mut self) -> EngineResult<Box<dyn SymbolGroupBackend>>;

    /// Run `expression` as a function call inside the debuggee. The debuggee
    /// runs until the call returns.
    ///
    /// ## Errors
    ///
    /// [`CallError::Crashed`] if the debuggee raised an exception,
    /// [`CallError::Failed`] if the call could not be made.
    fn call_function(&mut self, expression: &str) -> Result<u64, CallError>;

    /// Continue once with "exception not handled" semantics after a crash.
    ///
    /// ## Errors
    ///
    /// Fails if the engine cannot resume the debuggee.
    fn resume_unhandled(&mut self) -> EngineResult<()>;
}

pub use call::call_function;
pub use simulated::{SimulatedProcess, SimulatedTarget};
