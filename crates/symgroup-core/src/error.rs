//! # Error Types
//!
//! Errors raised by tree operations, dumpers and session commands.
//!
//! Engine-level failures ([`EngineError`]) are wrapped as they propagate up;
//! every variant renders into the message text of a failure response line,
//! so messages are written for the person looking at the IDE.

use thiserror::Error;

use crate::engine::EngineError;

/// Main error type for symbol-group operations.
///
/// ## Error Categories
///
/// 1. **Lookup errors**: NoSuchNode, NoContext
/// 2. **Structural errors**: RefuseExpandUninitialized, CollapseRoot,
///    CastExpandedNode, Inconsistent
/// 3. **Value errors**: NotEditable, Assign, Dumper
/// 4. **Injected calls**: InjectedCall
/// 5. **Engine errors**: Engine (memory access, symbol and type lookup)
#[derive(Error, Debug)]
pub enum SymbolGroupError
{
    /// No node exists at the given iname
    #[error("No such node {0}")]
    NoSuchNode(String),

    /// The variable is not initialized at the current location
    #[error("refusing to expand uninitialized node {0}")]
    RefuseExpandUninitialized(String),

    /// The root of a tree cannot be collapsed or removed
    #[error("Cannot collapse or remove the root node")]
    CollapseRoot,

    /// Type casts are only possible before a node is expanded
    #[error("Cannot change the type of expanded node {0}")]
    CastExpandedNode(String),

    /// Index bookkeeping does not match the engine's symbol group
    ///
    /// Raised by [`SymbolGroup::verify_indices`](crate::tree::SymbolGroup::verify_indices);
    /// indicates a bug in the shift propagation.
    #[error("Symbol group inconsistent: {0}")]
    Inconsistent(String),

    /// The node cannot be assigned to
    #[error("Node {0} is not editable")]
    NotEditable(String),

    /// Assignment failed after the value was accepted
    #[error("Assignment failed: {0}")]
    Assign(String),

    /// A dumper could not decode a value
    #[error("Dumper failed: {0}")]
    Dumper(String),

    /// A function call injected into the debuggee failed or crashed
    #[error("Injected call failed: {0}")]
    InjectedCall(String),

    /// No tree exists for the requested context
    #[error("No symbol group for {0}")]
    NoContext(String),

    /// The request could not be decoded
    #[error(transparent)]
    Protocol(#[from] symgroup_protocol::ProtocolError),

    /// Error reported by the debugger engine
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Convenience type alias for symbol-group results.
pub type Result<T> = std::result::Result<T, SymbolGroupError>;
