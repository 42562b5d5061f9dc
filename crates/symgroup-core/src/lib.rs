//! # symgroup-core
//!
//! Variable inspection on top of a debugger engine's symbol groups.
//!
//! This crate provides:
//! - The engine facade ([`engine::DebugTarget`], [`engine::SymbolGroupBackend`])
//!   and an in-memory simulated engine
//! - The incrementally expandable variable tree ([`tree::SymbolGroup`])
//! - Value handles for navigating variables ([`value::SymbolGroupValue`])
//! - Type-driven dumpers for strings, library value types, containers and
//!   smart pointers ([`dumpers`], [`containers`])
//! - A [`session::Session`] answering locals, watches, expand, assign and
//!   type-cast commands with protocol responses
//!
//! ## Example
//!
//! ```rust
//! use symgroup_core::engine::simulated::SimulatedProcess;
//! use symgroup_core::events::EventQueue;
//! use symgroup_core::session::Session;
//! use symgroup_core::types::ThreadId;
//! use symgroup_protocol::DumpRequest;
//! use symgroup_utils::DumpSettings;
//!
//! let mut process = SimulatedProcess::new(8);
//! let x = process.alloc_bytes(&[5, 0, 0, 0]);
//! process.add_frame(ThreadId(1), 0, "main", &[("x", "int", x)]);
//!
//! let mut session = Session::new(Box::new(process.into_target()), EventQueue::detached(), DumpSettings::default());
//! let response = session.locals(1, &DumpRequest::for_frame(0));
//! assert!(response.payload.contains(r#"name="x",type="int""#));
//! assert!(response.payload.contains(r#"value="5""#));
//! ```

pub mod cache;
pub mod containers;
pub mod dumpers;
pub mod engine;
pub mod error;
pub mod events;
pub mod prelude;
pub mod session;
pub mod tree;
pub mod types;
pub mod value;

pub use error::{Result, SymbolGroupError};
pub use session::Session;
pub use tree::SymbolGroup;
pub use types::{Address, FrameKey, ThreadId};
pub use value::{DumpContext, SymbolGroupValue};
