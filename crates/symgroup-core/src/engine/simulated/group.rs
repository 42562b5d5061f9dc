//! Index-addressed symbol group over the simulated process.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use super::format::{self, parse_integer};
use super::types::{normalize_type, TypeShape};
use super::{SimulatedProcess, Variable};
use crate::engine::{EngineError, EngineResult, SymbolEntry, SymbolFlags, SymbolGroupBackend, SymbolParameters};
use crate::types::{Address, ThreadId};

#[derive(Debug, Clone)]
struct Slot
{
    name: String,
    type_name: String,
    address: Option<Address>,
    depth: usize,
    expanded: bool,
}

impl Slot
{
    fn top_level(name: &str, type_name: &str, address: Option<Address>) -> Self
    {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            address,
            depth: 0,
            expanded: false,
        }
    }
}

/// Flat symbol array with CDB-style expand semantics.
#[derive(Debug)]
pub struct SimulatedSymbolGroup
{
    process: Rc<RefCell<SimulatedProcess>>,
    scope: Option<(ThreadId, u32)>,
    slots: Vec<Slot>,
}

impl SimulatedSymbolGroup
{
    pub(crate) fn for_scope(process: Rc<RefCell<SimulatedProcess>>, scope: (ThreadId, u32), locals: &[Variable]) -> Self
    {
        let slots = locals
            .iter()
            .map(|v| Slot::top_level(&v.name, &v.type_name, Some(v.address)))
            .collect();
        Self {
            process,
            scope: Some(scope),
            slots,
        }
    }

    pub(crate) fn unscoped(process: Rc<RefCell<SimulatedProcess>>) -> Self
    {
        Self {
            process,
            scope: None,
            slots: Vec::new(),
        }
    }

    fn slot(&self, index: usize) -> EngineResult<&Slot>
    {
        self.slots.get(index).ok_or(EngineError::InvalidIndex(index))
    }

    /// Children the engine would materialise for a slot.
    fn children_of(process: &SimulatedProcess, slot: &Slot) -> Vec<Slot>
    {
        let Some(address) = slot.address else {
            return Vec::new();
        };
        let normalized = normalize_type(&slot.type_name);
        let child = |name: &str, type_name: &str, address: Address| Slot {
            name: name.to_string(),
            type_name: type_name.to_string(),
            address: Some(address),
            depth: slot.depth + 1,
            expanded: false,
        };
        match process.types.shape(&normalized) {
            Some(TypeShape::Struct(def)) => def
                .bases
                .iter()
                .chain(def.fields.iter())
                .map(|f| child(&f.name, &f.type_name, address + f.offset))
                .collect(),
            Some(TypeShape::Pointer(pointee)) => {
                let Some(TypeShape::Struct(def)) = process.types.shape(pointee) else {
                    return Vec::new();
                };
                match process.read_unsigned(address, process.pointer_size) {
                    Ok(0) | Err(_) => Vec::new(),
                    Ok(target) => def
                        .bases
                        .iter()
                        .chain(def.fields.iter())
                        .map(|f| child(&f.name, &f.type_name, Address::new(target) + f.offset))
                        .collect(),
                }
            }
            Some(TypeShape::Array { element, count }) => {
                let Some(size) = process.types.size_of(element, process.pointer_size) else {
                    return Vec::new();
                };
                (0..count).map(|i| child(&format!("[{i}]"), element, address + i * size)).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Index just past the last descendant of `index`.
    fn subtree_end(&self, index: usize) -> usize
    {
        let depth = self.slots[index].depth;
        let mut end = index + 1;
        while end < self.slots.len() && self.slots[end].depth > depth {
            end += 1;
        }
        end
    }

    fn parent_of(&self, index: usize) -> Option<usize>
    {
        let depth = self.slots[index].depth;
        if depth == 0 {
            return None;
        }
        (0..index).rev().find(|&i| self.slots[i].depth < depth)
    }

    /// Evaluate the expression subset understood by the simulated engine:
    /// `*(TYPE *)ADDRESS` and identifiers with `.`/`->` member access.
    fn evaluate(&self, process: &SimulatedProcess, expression: &str) -> EngineResult<Slot>
    {
        let expression = expression.trim();
        if let Some(cast) = expression.strip_prefix("*(") {
            let close = cast
                .rfind(')')
                .ok_or_else(|| EngineError::SymbolNotFound(expression.to_string()))?;
            let pointer_type = cast[..close].trim();
            let type_name = pointer_type
                .strip_suffix('*')
                .ok_or_else(|| EngineError::SymbolNotFound(expression.to_string()))?
                .trim_end();
            let address = parse_integer(&cast[close + 1..])
                .and_then(|a| u64::try_from(a).ok())
                .ok_or_else(|| EngineError::SymbolNotFound(expression.to_string()))?;
            let normalized = normalize_type(type_name);
            if process.types.shape(&normalized).is_none() {
                return Err(EngineError::TypeNotFound(type_name.to_string()));
            }
            return Ok(Slot::top_level(expression, &normalized, Some(Address::new(address))));
        }

        let path = expression.replace("->", ".");
        let mut parts = path.split('.').map(str::trim);
        let first = parts.next().unwrap_or_default();
        let variable = process
            .lookup_variable(self.scope, first)
            .ok_or_else(|| EngineError::SymbolNotFound(expression.to_string()))?;
        let mut type_name = variable.type_name.clone();
        let mut address = variable.address;
        for member in parts {
            let mut normalized = normalize_type(&type_name);
            let pointee = match process.types.shape(&normalized) {
                Some(TypeShape::Pointer(pointee)) => Some(pointee.to_string()),
                _ => None,
            };
            if let Some(pointee) = pointee {
                address = Address::new(process.read_unsigned(address, process.pointer_size)?);
                normalized = pointee;
            }
            let def = process
                .types
                .struct_def(&normalized)
                .ok_or_else(|| EngineError::SymbolNotFound(expression.to_string()))?;
            let field = def
                .fields
                .iter()
                .find(|f| f.name == member)
                .ok_or_else(|| EngineError::SymbolNotFound(expression.to_string()))?;
            address = address + field.offset;
            type_name.clone_from(&field.type_name);
        }
        Ok(Slot::top_level(expression, &type_name, Some(address)))
    }
}

impl SymbolGroupBackend for SimulatedSymbolGroup
{
    fn count(&self) -> usize
    {
        self.slots.len()
    }

    fn entries(&self, start: usize, count: usize) -> EngineResult<Vec<SymbolEntry>>
    {
        let end = start.checked_add(count).ok_or(EngineError::InvalidIndex(start))?;
        if end > self.slots.len() {
            return Err(EngineError::InvalidIndex(end.saturating_sub(1)));
        }
        let process = self.process.borrow();
        Ok((start..end)
            .map(|index| {
                let slot = &self.slots[index];
                let mut flags = SymbolFlags::empty();
                if slot.expanded {
                    flags |= SymbolFlags::EXPANDED;
                }
                SymbolEntry {
                    name: slot.name.clone(),
                    type_name: slot.type_name.clone(),
                    address: slot.address,
                    size: process.types.size_of(&slot.type_name, process.pointer_size).unwrap_or(0),
                    value_text: format::format_value(&process, &slot.type_name, slot.address),
                    parameters: SymbolParameters {
                        parent: self.parent_of(index),
                        sub_elements: Self::children_of(&process, slot).len(),
                        flags,
                    },
                }
            })
            .collect())
    }

    fn expand(&mut self, index: usize, expand: bool) -> EngineResult<()>
    {
        let slot = self.slot(index)?;
        if slot.expanded == expand {
            return Ok(());
        }
        if expand {
            let children = Self::children_of(&self.process.borrow(), slot);
            debug!("expand {index}: {} children", children.len());
            self.slots.splice(index + 1..index + 1, children);
        } else {
            let end = self.subtree_end(index);
            self.slots.drain(index + 1..end);
        }
        self.slots[index].expanded = expand;
        Ok(())
    }

    fn add_symbol(&mut self, expression: &str) -> EngineResult<usize>
    {
        let slot = self.evaluate(&self.process.borrow(), expression)?;
        self.slots.push(slot);
        Ok(self.slots.len() - 1)
    }

    fn remove_symbol(&mut self, index: usize) -> EngineResult<()>
    {
        self.slot(index)?;
        let end = self.subtree_end(index);
        self.slots.drain(index..end);
        Ok(())
    }

    fn write_symbol(&mut self, index: usize, value: &str) -> EngineResult<()>
    {
        let slot = self.slot(index)?;
        let address = slot
            .address
            .ok_or_else(|| EngineError::Unsupported(format!("{} has no storage", slot.name)))?;
        let type_name = slot.type_name.clone();
        self.process.borrow_mut().write_value(address, &type_name, value)
    }

    fn output_as_type(&mut self, index: usize, type_name: &str) -> EngineResult<()>
    {
        let slot = self.slot(index)?;
        if slot.expanded {
            return Err(EngineError::Unsupported(format!("{} is expanded", slot.name)));
        }
        let normalized = normalize_type(type_name);
        if self.process.borrow().types.shape(&normalized).is_none() {
            return Err(EngineError::TypeNotFound(type_name.to_string()));
        }
        self.slots[index].type_name = normalized;
        Ok(())
    }
}
