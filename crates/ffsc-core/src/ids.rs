//! Dense indices into the engine topology.
//!
//! Components are numbered in `engine.json` order and connections in the
//! order they are added. A component index can not be passed where a
//! connection index is expected.

use core::fmt;
use core::num::NonZeroU32;

macro_rules! topology_index {
    ($(#[$doc:meta])* $name:ident, $tag:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Stored as index + 1 so that `Option<Self>` stays four bytes.
            pub fn from_index(index: u32) -> Self {
                Self(NonZeroU32::MIN.saturating_add(index))
            }

            pub fn index(self) -> u32 {
                self.0.get() - 1
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "#{}"), self.index())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.index())
            }
        }
    };
}

topology_index!(
    /// Position of a component in the engine definition.
    CompId,
    "comp"
);

topology_index!(
    /// Position of a connection (an edge of the flow graph).
    LinkId,
    "link"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_positions_survive_conversion() {
        for i in [0_u32, 12, 4_096] {
            assert_eq!(CompId::from_index(i).index(), i);
            assert_eq!(LinkId::from_index(i).index(), i);
        }
    }

    #[test]
    fn unset_link_costs_nothing() {
        assert_eq!(
            core::mem::size_of::<LinkId>(),
            core::mem::size_of::<Option<LinkId>>()
        );
    }

    #[test]
    fn debug_names_the_kind_of_index() {
        assert_eq!(format!("{:?}", CompId::from_index(3)), "comp#3");
        assert_eq!(format!("{:?}", LinkId::from_index(0)), "link#0");
        assert_eq!(CompId::from_index(7).to_string(), "7");
    }
}
