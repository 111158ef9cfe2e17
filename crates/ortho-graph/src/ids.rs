//! Stable integer ids.
//!
//! Nodes and edges are identified by small integers assigned in insertion order.
//! Every traversal in `ortho-layout` sorts or iterates by these ids rather than by
//! hash-iteration order, which is what makes layout reproducible (see the
//! determinism design note).

use std::fmt;

macro_rules! stable_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

stable_id!(NodeId);
stable_id!(EdgeId);
