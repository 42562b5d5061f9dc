//! Common module for library exports

pub use crate::dumpers::{classify, KnownType, KnownTypeFlags};
pub use crate::engine::simulated::{Scenario, SimulatedProcess, SimulatedTarget, StructDef};
pub use crate::engine::{DebugTarget, EngineError, SymbolGroupBackend};
pub use crate::error::{Result, SymbolGroupError};
pub use crate::events::{event_channel, DebuggerEvent, EventQueue};
pub use crate::session::{Scope, Session};
pub use crate::tree::{NodeFlags, NodeId, SymbolGroup};
pub use crate::types::{Address, FrameKey, ThreadId};
