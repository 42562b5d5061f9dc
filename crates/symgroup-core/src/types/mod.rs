//! # Types
//!
//! Small value types shared by the engine facade, the tree and the dumpers.

pub mod address;

pub use address::Address;

/// Engine thread identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u64);

impl ThreadId
{
    #[must_use]
    pub fn raw(self) -> u64
    {
        self.0
    }
}

impl From<u64> for ThreadId
{
    fn from(value: u64) -> Self
    {
        Self(value)
    }
}

/// A (thread, frame) pair: the context a locals tree is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameKey
{
    pub thread: ThreadId,
    pub frame: u32,
}
