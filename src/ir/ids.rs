//! Strongly-typed handles into the arenas owned by a [`Graph`](crate::ir::Graph).
//!
//! Every entity of the IR (blocks, values, phis, loops) lives in a `Vec` owned by the
//! graph and is referred to by a newtype index. Handles are cheap to copy and stay valid
//! for the whole lifetime of the graph that produced them; they are never reused and never
//! shared between graphs.
//!
//! A [`BlockId`] is a *handle*, not the block's dense id. The dense id (see
//! [`BasicBlock::id`](crate::ir::BasicBlock::id)) is the creation number while the graph is
//! under construction and the position in the final order once blocks have been ordered.
//! Handles never change.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Creates a handle from a raw arena index.
            ///
            /// Primarily intended for internal use and testing; normal code obtains
            /// handles from the [`Graph`](crate::ir::Graph).
            #[must_use]
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw arena index.
            #[must_use]
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Handle of a basic block.
    BlockId,
    "b"
);

define_id!(
    /// Handle of a value: a parameter, constant, instruction result or phi.
    ValueId,
    "v"
);

define_id!(
    /// Handle of a phi node.
    PhiId,
    "phi"
);

define_id!(
    /// Handle of a loop-information record.
    LoopId,
    "loop"
);

/// Converts an arena length into the next handle index.
///
/// Arena sizes are bounded by [`GraphConfig::max_blocks`](crate::GraphConfig) for blocks,
/// but values are not, so the conversion saturates instead of wrapping.
pub(crate) fn next_index(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
