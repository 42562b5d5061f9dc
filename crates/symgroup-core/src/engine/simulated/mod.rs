//! # Simulated engine
//!
//! An in-memory debuggee implementing both facade traits: a type registry,
//! memory regions, stack frames with locals, globals, loaded modules and a
//! pluggable model for injected calls (including crashing calls). Used by the
//! test suites and by the replay CLI, which loads scenarios from TOML
//! (see [`scenario`]).
//!
//! ## Example
//!
//! ```rust
//! use symgroup_core::engine::simulated::{SimulatedProcess, StructDef};
//! use symgroup_core::engine::DebugTarget;
//! use symgroup_core::types::ThreadId;
//!
//! let mut process = SimulatedProcess::new(8);
//! process.add_struct(StructDef::new_struct("Point", 8).with_field("x", "int", 0).with_field("y", "int", 4));
//! let p = process.alloc_bytes(&[1, 0, 0, 0, 2, 0, 0, 0]);
//! process.add_frame(ThreadId(1), 0, "main", &[("p", "Point", p)]);
//!
//! let target = process.into_target();
//! assert_eq!(target.type_size("Point"), 8);
//! assert_eq!(target.field_offset("Point", "y"), Some(4));
//! ```

mod format;
mod group;
pub mod scenario;
pub mod types;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tracing::{debug, trace};

pub use self::format::{format_pointer, MEMORY_ERROR_TEXT};
pub use self::group::SimulatedSymbolGroup;
pub use self::scenario::{Scenario, ScenarioError};
pub use self::types::{EnumDef, Enumerator, Field, Keyword, Primitive, StructDef, TypeRegistry};
use super::{CallError, DebugTarget, EngineError, EngineResult, SymbolGroupBackend};
use crate::events::{DebuggerEvent, DebuggerEventSender};
use crate::types::{Address, ThreadId};

/// Handler deciding the outcome of an injected call.
pub type CallHandler = Box<dyn FnMut(&mut SimulatedProcess, &str) -> Result<u64, CallError>>;

/// Where heap allocations of [`SimulatedProcess::alloc`] start.
const HEAP_BASE: u64 = 0x0010_0000;

/// A variable in a frame or a global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable
{
    pub name: String,
    pub type_name: String,
    pub address: Address,
}

/// One stack frame.
#[derive(Debug, Clone, Default)]
pub struct Frame
{
    pub function: String,
    pub locals: Vec<Variable>,
}

/// State of the simulated debuggee.
pub struct SimulatedProcess
{
    pub(crate) pointer_size: u64,
    pub(crate) types: TypeRegistry,
    memory: BTreeMap<u64, Vec<u8>>,
    frames: HashMap<(ThreadId, u32), Frame>,
    globals: Vec<Variable>,
    modules: Vec<String>,
    current_thread: ThreadId,
    next_alloc: u64,
    events: Option<DebuggerEventSender>,
    call_handler: Option<CallHandler>,
    crash_calls: bool,
    calls: Vec<String>,
    unhandled_resumes: usize,
}

impl std::fmt::Debug for SimulatedProcess
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("SimulatedProcess")
            .field("pointer_size", &self.pointer_size)
            .field("regions", &self.memory.len())
            .field("frames", &self.frames.len())
            .field("modules", &self.modules)
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}

impl SimulatedProcess
{
    /// Empty process with the given pointer size (4 or 8).
    #[must_use]
    pub fn new(pointer_size: u64) -> Self
    {
        Self {
            pointer_size,
            types: TypeRegistry::default(),
            memory: BTreeMap::new(),
            frames: HashMap::new(),
            globals: Vec::new(),
            modules: Vec::new(),
            current_thread: ThreadId(1),
            next_alloc: HEAP_BASE,
            events: None,
            call_handler: None,
            crash_calls: false,
            calls: Vec::new(),
            unhandled_resumes: 0,
        }
    }

    /// Wrap the process into a target sharing its state.
    #[must_use]
    pub fn into_target(self) -> SimulatedTarget
    {
        SimulatedTarget::new(Rc::new(RefCell::new(self)))
    }

    pub fn add_struct(&mut self, def: StructDef)
    {
        self.types.add_struct(def);
    }

    pub fn add_enum(&mut self, def: EnumDef)
    {
        self.types.add_enum(def);
    }

    #[must_use]
    pub fn types(&self) -> &TypeRegistry
    {
        &self.types
    }

    pub fn add_module(&mut self, name: &str)
    {
        self.modules.push(name.to_string());
    }

    pub fn set_current_thread(&mut self, thread: ThreadId)
    {
        self.current_thread = thread;
    }

    /// Define a frame with `(name, type, address)` locals.
    pub fn add_frame(&mut self, thread: ThreadId, frame: u32, function: &str, locals: &[(&str, &str, Address)])
    {
        let locals = locals
            .iter()
            .map(|(name, type_name, address)| Variable {
                name: (*name).to_string(),
                type_name: (*type_name).to_string(),
                address: *address,
            })
            .collect();
        self.frames.insert(
            (thread, frame),
            Frame {
                function: function.to_string(),
                locals,
            },
        );
    }

    pub fn add_global(&mut self, name: &str, type_name: &str, address: Address)
    {
        self.globals.push(Variable {
            name: name.to_string(),
            type_name: type_name.to_string(),
            address,
        });
    }

    /// Map a region of memory at a fixed address.
    pub fn map_memory(&mut self, address: Address, bytes: Vec<u8>)
    {
        self.memory.insert(address.value(), bytes);
    }

    /// Allocate `size` zeroed bytes on the simulated heap (16-byte aligned).
    pub fn alloc(&mut self, size: u64) -> Address
    {
        let address = self.next_alloc;
        self.next_alloc = (address + size.max(1)).div_ceil(16) * 16;
        let len = usize::try_from(size).unwrap_or(0);
        self.memory.insert(address, vec![0; len]);
        Address::new(address)
    }

    /// Allocate and initialise heap memory.
    pub fn alloc_bytes(&mut self, bytes: &[u8]) -> Address
    {
        let address = self.alloc(bytes.len() as u64);
        self.memory.insert(address.value(), bytes.to_vec());
        address
    }

    /// Read bytes. The range must lie within a single region.
    ///
    /// ## Errors
    ///
    /// [`EngineError::MemoryAccess`] if the range is not mapped.
    pub fn read(&self, address: Address, len: usize) -> EngineResult<Vec<u8>>
    {
        let error = || EngineError::MemoryAccess { address, len };
        let (start, bytes) = self.memory.range(..=address.value()).next_back().ok_or_else(error)?;
        let offset = usize::try_from(address.value() - start).map_err(|_| error())?;
        let end = offset.checked_add(len).ok_or_else(error)?;
        bytes.get(offset..end).map(<[u8]>::to_vec).ok_or_else(error)
    }

    /// Write bytes into mapped memory.
    ///
    /// ## Errors
    ///
    /// [`EngineError::MemoryWrite`] if the range is not mapped.
    pub fn write(&mut self, address: Address, data: &[u8]) -> EngineResult<()>
    {
        let error = || EngineError::MemoryWrite {
            address,
            len: data.len(),
        };
        let (start, bytes) = self.memory.range_mut(..=address.value()).next_back().ok_or_else(error)?;
        let offset = usize::try_from(address.value() - *start).map_err(|_| error())?;
        let end = offset.checked_add(data.len()).ok_or_else(error)?;
        bytes.get_mut(offset..end).ok_or_else(error)?.copy_from_slice(data);
        Ok(())
    }

    /// Read a little-endian unsigned integer of up to 8 bytes.
    ///
    /// ## Errors
    ///
    /// Fails if the memory is not mapped.
    pub fn read_unsigned(&self, address: Address, size: u64) -> EngineResult<u64>
    {
        let len = usize::try_from(size.min(8)).unwrap_or(8);
        let bytes = self.read(address, len)?;
        let mut buf = [0u8; 8];
        buf[..len].copy_from_slice(&bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Read a little-endian signed integer of up to 8 bytes.
    ///
    /// ## Errors
    ///
    /// Fails if the memory is not mapped.
    pub fn read_signed(&self, address: Address, size: u64) -> EngineResult<i64>
    {
        let size = size.clamp(1, 8);
        let raw = self.read_unsigned(address, size)?;
        let shift = 64 - size * 8;
        #[allow(clippy::cast_possible_wrap)]
        Ok(((raw << shift) as i64) >> shift)
    }

    /// Write a little-endian unsigned integer of `size` bytes.
    ///
    /// ## Errors
    ///
    /// Fails if the memory is not mapped.
    pub fn write_unsigned(&mut self, address: Address, size: u64, value: u64) -> EngineResult<()>
    {
        let len = usize::try_from(size.min(8)).unwrap_or(8);
        self.write(address, &value.to_le_bytes()[..len])
    }

    /// Write a pointer of the process's pointer width.
    ///
    /// ## Errors
    ///
    /// Fails if the memory is not mapped.
    pub fn write_pointer(&mut self, address: Address, value: Address) -> EngineResult<()>
    {
        self.write_unsigned(address, self.pointer_size, value.value())
    }

    /// Store `text` as a value of `type_name` (same parsing as assignments).
    ///
    /// ## Errors
    ///
    /// Fails if the text does not parse for the type or the memory is not mapped.
    pub fn write_value(&mut self, address: Address, type_name: &str, text: &str) -> EngineResult<()>
    {
        let bytes = format::encode_value(self, type_name, text)?;
        self.write(address, &bytes)
    }

    /// Install the handler that runs injected calls.
    pub fn set_call_handler(&mut self, handler: CallHandler)
    {
        self.call_handler = Some(handler);
    }

    /// Make every injected call crash.
    pub fn set_crash_calls(&mut self, crash: bool)
    {
        self.crash_calls = crash;
    }

    /// Expressions of all injected calls so far.
    #[must_use]
    pub fn calls(&self) -> &[String]
    {
        &self.calls
    }

    /// How often the debuggee was resumed with "exception not handled".
    #[must_use]
    pub fn unhandled_resumes(&self) -> usize
    {
        self.unhandled_resumes
    }

    /// Publish engine events on `sender`.
    pub fn set_event_sender(&mut self, sender: DebuggerEventSender)
    {
        self.events = Some(sender);
    }

    fn emit(&self, event: DebuggerEvent)
    {
        if let Some(sender) = &self.events {
            // A dropped receiver just means nobody listens any more
            let _ = sender.send(event);
        }
    }

    pub(crate) fn frame(&self, thread: ThreadId, frame: u32) -> EngineResult<&Frame>
    {
        self.frames
            .get(&(thread, frame))
            .ok_or(EngineError::FrameNotFound { thread, frame })
    }

    /// Look up a variable for expression evaluation: the given scope first,
    /// then the current thread's innermost frame, then globals.
    pub(crate) fn lookup_variable(&self, scope: Option<(ThreadId, u32)>, name: &str) -> Option<&Variable>
    {
        let (thread, frame) = scope.unwrap_or((self.current_thread, 0));
        self.frames
            .get(&(thread, frame))
            .and_then(|f| f.locals.iter().rev().find(|v| v.name == name))
            .or_else(|| self.globals.iter().find(|v| v.name == name))
    }
}

/// [`DebugTarget`] over a shared [`SimulatedProcess`].
#[derive(Debug, Clone)]
pub struct SimulatedTarget
{
    process: Rc<RefCell<SimulatedProcess>>,
}

impl SimulatedTarget
{
    #[must_use]
    pub fn new(process: Rc<RefCell<SimulatedProcess>>) -> Self
    {
        Self { process }
    }

    /// Shared handle to the process state, for inspection after the target
    /// has been handed to a session.
    #[must_use]
    pub fn process(&self) -> Rc<RefCell<SimulatedProcess>>
    {
        Rc::clone(&self.process)
    }

    /// Let the debuggee run (publishes [`DebuggerEvent::TargetResumed`]).
    pub fn resume(&self)
    {
        self.process.borrow().emit(DebuggerEvent::TargetResumed);
    }

    /// Stop the debuggee again.
    pub fn stop(&self)
    {
        let process = self.process.borrow();
        process.emit(DebuggerEvent::TargetStopped {
            thread: Some(process.current_thread),
            exception: false,
        });
    }

    /// Map a new module into the debuggee.
    pub fn load_module(&self, name: &str)
    {
        let mut process = self.process.borrow_mut();
        process.add_module(name);
        process.emit(DebuggerEvent::ModuleLoaded { name: name.to_string() });
    }

    pub fn end_session(&self)
    {
        self.process.borrow().emit(DebuggerEvent::SessionEnded);
    }
}

impl DebugTarget for SimulatedTarget
{
    fn read_memory(&self, address: Address, len: usize) -> EngineResult<Vec<u8>>
    {
        trace!("read_memory({address}, {len})");
        self.process.borrow().read(address, len)
    }

    fn write_memory(&mut self, address: Address, bytes: &[u8]) -> EngineResult<()>
    {
        trace!("write_memory({address}, {})", bytes.len());
        self.process.borrow_mut().write(address, bytes)
    }

    fn type_size(&self, type_name: &str) -> u64
    {
        let process = self.process.borrow();
        process.types.size_of(type_name, process.pointer_size).unwrap_or(0)
    }

    fn field_offset(&self, type_name: &str, field: &str) -> Option<u64>
    {
        self.process.borrow().types.field_offset(type_name, field)
    }

    fn resolve_type(&self, name: &str, module: Option<&str>) -> EngineResult<String>
    {
        let process = self.process.borrow();
        if !process.types.contains(name) {
            return Err(EngineError::TypeNotFound(name.to_string()));
        }
        Ok(match module {
            Some(module) => format!("{module}!{name}"),
            None => name.to_string(),
        })
    }

    fn pointer_size(&self) -> u64
    {
        self.process.borrow().pointer_size
    }

    fn modules(&self) -> Vec<String>
    {
        self.process.borrow().modules.clone()
    }

    fn current_thread(&self) -> ThreadId
    {
        self.process.borrow().current_thread
    }

    fn frame_function(&self, thread: ThreadId, frame: u32) -> EngineResult<String>
    {
        Ok(self.process.borrow().frame(thread, frame)?.function.clone())
    }

    fn scope_group(&mut self, thread: ThreadId, frame: u32) -> EngineResult<Box<dyn SymbolGroupBackend>>
    {
        let locals = self.process.borrow().frame(thread, frame)?.locals.clone();
        debug!("Creating scope group for thread {} frame {frame}", thread.raw());
        Ok(Box::new(SimulatedSymbolGroup::for_scope(
            Rc::clone(&self.process),
            (thread, frame),
            &locals,
        )))
    }

    fn watch_group(&mut self) -> EngineResult<Box<dyn SymbolGroupBackend>>
    {
        Ok(Box::new(SimulatedSymbolGroup::unscoped(Rc::clone(&self.process))))
    }

    fn call_function(&mut self, expression: &str) -> Result<u64, CallError>
    {
        let mut process = self.process.borrow_mut();
        process.calls.push(expression.to_string());
        process.emit(DebuggerEvent::TargetResumed);
        let thread = Some(process.current_thread);

        if process.crash_calls {
            process.emit(DebuggerEvent::TargetStopped { thread, exception: true });
            return Err(CallError::Crashed("access violation".to_string()));
        }

        let result = match process.call_handler.take() {
            Some(mut handler) => {
                let result = handler(&mut process, expression);
                process.call_handler = Some(handler);
                result
            }
            None => Err(CallError::Failed(format!("cannot evaluate '{expression}'"))),
        };
        let exception = matches!(result, Err(CallError::Crashed(_)));
        process.emit(DebuggerEvent::TargetStopped { thread, exception });
        result
    }

    fn resume_unhandled(&mut self) -> EngineResult<()>
    {
        let mut process = self.process.borrow_mut();
        process.unhandled_resumes += 1;
        process.emit(DebuggerEvent::TargetResumed);
        let thread = Some(process.current_thread);
        process.emit(DebuggerEvent::TargetStopped { thread, exception: false });
        Ok(())
    }
}
