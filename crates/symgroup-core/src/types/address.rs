//! Debuggee memory address.

use std::fmt;
use std::ops::{Add, Sub};

/// Address in the debuggee's virtual address space.
///
/// Keeps addresses apart from sizes, counts and symbol indices, which are all
/// plain integers in the engine API.
///
/// ## Example
///
/// ```rust
/// use symgroup_core::types::Address;
///
/// let node = Address::new(0x1000);
/// assert_eq!((node + 0x10).value(), 0x1010);
/// assert!(Address::NULL.is_null());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null pointer value.
    pub const NULL: Self = Address(0);

    #[must_use]
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn value(self) -> u64
    {
        self.0
    }

    #[must_use]
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Add an offset, `None` on overflow.
    #[must_use]
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Distance from `base` to `self`, `None` if `self` lies below `base`.
    #[must_use]
    pub fn offset_from(self, base: Address) -> Option<u64>
    {
        self.0.checked_sub(base.0)
    }

    /// The `*(TYPE *)0xADDR` expression the engine understands for a value
    /// of `type_name` living at this address.
    #[must_use]
    pub fn typed_expression(self, type_name: &str) -> String
    {
        format!("*({type_name} *){self}")
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:x}", self.0)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_typed_expression()
    {
        assert_eq!(Address::new(0x1f0).typed_expression("QString"), "*(QString *)0x1f0");
    }

    #[test]
    fn test_offset_from()
    {
        let base = Address::new(0x1000);
        assert_eq!(Address::new(0x1018).offset_from(base), Some(0x18));
        assert_eq!(Address::new(0x0ff0).offset_from(base), None);
    }
}
