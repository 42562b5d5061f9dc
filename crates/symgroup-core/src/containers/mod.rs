//! # Container layout decoders
//!
//! Each container family knows how to find its size and the addresses of its
//! first elements from raw memory:
//!
//! | family | types |
//! |---|---|
//! | [`Family::Array`] | `std::vector`, `QVector`, `QList`, `QStringList` |
//! | [`Family::LinkedList`] | `std::list` |
//! | [`Family::Deque`] | `std::deque`, `std::stack` |
//! | [`Family::RbTree`] | `std::map`, `std::multimap`, `std::set`, `std::multiset`, `QMap`, `QMultiMap` |
//! | [`Family::Hash`] | `QHash`, `QMultiHash`, `QSet` |
//!
//! Decoding never yields more than [`DumpSettings::container_limit`]
//! elements (at most 100). A read failure mid-way returns the elements found
//! so far.
//!
//! [`DumpSettings::container_limit`]: symgroup_utils::DumpSettings::container_limit

pub mod array;
pub mod deque;
pub mod hash;
pub mod list;
pub mod rbtree;

use crate::dumpers::typename::{strip_keywords, strip_module, strip_pointer, template_arguments};
use crate::dumpers::KnownType;
use crate::engine::memory::natural_alignment;
use crate::error::{Result, SymbolGroupError};
use crate::types::Address;
use crate::value::{DumpContext, SymbolGroupValue};

/// Layout family of a container type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family
{
    Array,
    LinkedList,
    Deque,
    RbTree,
    Hash,
}

impl Family
{
    #[must_use]
    pub fn of(known: KnownType) -> Option<Self>
    {
        match known {
            KnownType::StdVector | KnownType::QVector | KnownType::QList | KnownType::QStringList => Some(Self::Array),
            KnownType::StdList => Some(Self::LinkedList),
            KnownType::StdDeque | KnownType::StdStack => Some(Self::Deque),
            KnownType::StdMap
            | KnownType::StdMultiMap
            | KnownType::StdSet
            | KnownType::StdMultiSet
            | KnownType::QMap
            | KnownType::QMultiMap => Some(Self::RbTree),
            KnownType::QHash | KnownType::QMultiHash | KnownType::QSet => Some(Self::Hash),
            _ => None,
        }
    }
}

/// Type and size of the elements of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementType
{
    pub name: String,
    pub size: u64,
}

impl ElementType
{
    /// Look up the size of `name`.
    ///
    /// ## Errors
    ///
    /// [`SymbolGroupError::Dumper`] if the engine does not know the type.
    pub fn resolve(ctx: &DumpContext<'_>, name: &str) -> Result<Self>
    {
        match ctx.target.type_size(name) {
            0 => Err(SymbolGroupError::Dumper(format!("unknown element type {name}"))),
            size => Ok(Self {
                name: name.to_string(),
                size,
            }),
        }
    }

    #[must_use]
    pub fn alignment(&self, pointer_size: u64) -> u64
    {
        natural_alignment(self.size, pointer_size)
    }
}

/// Element types of a container: the element (or key) and, for maps, the
/// mapped type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTypes
{
    pub element: ElementType,
    pub mapped: Option<ElementType>,
}

/// Decoded elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Elements
{
    Sequence
    {
        element_type: String,
        addresses: Vec<Address>,
    },
    Map
    {
        key_type: String,
        value_type: String,
        entries: Vec<(Address, Address)>,
    },
}

impl Elements
{
    #[must_use]
    pub fn len(&self) -> usize
    {
        match self {
            Self::Sequence { addresses, .. } => addresses.len(),
            Self::Map { entries, .. } => entries.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }
}

/// The container type without pointer, keywords and module.
fn container_type(ctx: &DumpContext<'_>, value: &SymbolGroupValue) -> String
{
    let type_name = value.type_name(ctx.group);
    let name = strip_module(strip_keywords(&type_name));
    strip_pointer(name).unwrap_or(name).to_string()
}

/// Element types from the container's template arguments.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] if an argument is missing or unknown.
pub fn container_types(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, known: KnownType) -> Result<ContainerTypes>
{
    let type_name = container_type(ctx, value);
    if known == KnownType::QStringList {
        let name = ctx.qualified_type("QString");
        return Ok(ContainerTypes {
            element: ElementType::resolve(ctx, &name)?,
            mapped: None,
        });
    }
    let arguments = template_arguments(&type_name);
    let argument = |index: usize| {
        arguments
            .get(index)
            .map(|a| a.trim_end_matches(" const").trim().to_string())
            .ok_or_else(|| SymbolGroupError::Dumper(format!("{type_name}: missing template argument {index}")))
    };
    let element = ElementType::resolve(ctx, &argument(0)?)?;
    let mapped = match known {
        KnownType::StdMap | KnownType::StdMultiMap | KnownType::QMap | KnownType::QMultiMap | KnownType::QHash | KnownType::QMultiHash => {
            Some(ElementType::resolve(ctx, &argument(1)?)?)
        }
        _ => None,
    };
    Ok(ContainerTypes { element, mapped })
}

fn checked_count(count: i64, what: &str) -> Result<usize>
{
    usize::try_from(count).map_err(|_| SymbolGroupError::Dumper(format!("corrupt {what} size {count}")))
}

/// Number of elements of a container value.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] for unknown layouts or inconsistent sizes.
pub fn size(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, known: KnownType) -> Result<usize>
{
    let family = Family::of(known).ok_or_else(|| SymbolGroupError::Dumper(format!("{known:?} is not a container")))?;
    let count = match family {
        Family::Array => array::size(ctx, value, known)?,
        Family::LinkedList => list::size(ctx, value)?,
        Family::Deque => deque::size(ctx, value, known)?,
        Family::RbTree => rbtree::size(ctx, value, known)?,
        Family::Hash => hash::size(ctx, value, known)?,
    };
    checked_count(count, &format!("{known:?}"))
}

/// Decode up to the configured limit of elements.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] if the container header cannot be read.
pub fn decode(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, known: KnownType) -> Result<Elements>
{
    let family = Family::of(known).ok_or_else(|| SymbolGroupError::Dumper(format!("{known:?} is not a container")))?;
    let types = container_types(ctx, value, known)?;
    let count = size(ctx, value, known)?.min(ctx.settings.container_limit());
    let addresses = match family {
        Family::Array => array::elements(ctx, value, known, &types.element, count)?,
        Family::LinkedList => list::elements(ctx, value, &types.element, count)?,
        Family::Deque => deque::elements(ctx, value, known, &types.element, count)?,
        Family::RbTree => return rbtree::elements(ctx, value, known, &types, count),
        Family::Hash => return hash::elements(ctx, value, known, &types, count),
    };
    Ok(Elements::Sequence {
        element_type: types.element.name,
        addresses,
    })
}

/// Member that must exist, as an error otherwise.
pub(crate) fn required_member(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, name: &str) -> Result<SymbolGroupValue>
{
    let member = value.find_member(ctx, name);
    if member.is_valid() {
        Ok(member)
    } else {
        Err(SymbolGroupError::Dumper(member.error().to_string()))
    }
}

/// Pointer value of a required member.
pub(crate) fn pointer_member(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, name: &str) -> Result<Address>
{
    let member = required_member(ctx, value, name)?;
    Ok(Address::new(member.pointer_value(ctx.group, 0)))
}

/// Pointer value of a required member that must not be null.
pub(crate) fn non_null_member(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, name: &str) -> Result<Address>
{
    let address = pointer_member(ctx, value, name)?;
    if address.is_null() {
        return Err(SymbolGroupError::Dumper(format!("{name} is null")));
    }
    Ok(address)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_family_dispatch()
    {
        assert_eq!(Family::of(KnownType::QStringList), Some(Family::Array));
        assert_eq!(Family::of(KnownType::StdStack), Some(Family::Deque));
        assert_eq!(Family::of(KnownType::QSet), Some(Family::Hash));
        assert_eq!(Family::of(KnownType::QMultiMap), Some(Family::RbTree));
        assert_eq!(Family::of(KnownType::QString), None);
    }

    #[test]
    fn test_elements_len()
    {
        let elements = Elements::Map {
            key_type: "int".to_string(),
            value_type: "int".to_string(),
            entries: vec![(Address::new(1), Address::new(2))],
        };
        assert_eq!(elements.len(), 1);
        assert!(!elements.is_empty());
    }
}
