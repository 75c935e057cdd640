//! Values tracked by the graph.
//!
//! Every value the environment can bind to a slot has an entry in the graph's value
//! arena. The graph only records *where* a value comes from; what it computes is the
//! business of the instruction layer.

use std::fmt;

use crate::ir::{BlockId, PhiId};

/// Origin of a value.
///
/// | Kind | Defined by |
/// |------|------------|
/// | `Parameter(n)` | the entry block, one per formal parameter |
/// | `Undefined` | the graph, shared by every uninitialised slot |
/// | `Constant(c)` | the graph, interned per constant |
/// | `Instruction` | an instruction appended to `block` |
/// | `Phi` | a merge node owned by a block |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Formal parameter `n` of the compilation unit.
    Parameter(u32),

    /// The value of a slot that has not been assigned yet.
    Undefined,

    /// Integer constant.
    Constant(i64),

    /// Result of an instruction.
    Instruction {
        /// Block holding the instruction.
        block: BlockId,
        /// Position of the instruction in its block.
        position: u32,
    },

    /// Result of a phi node.
    Phi(PhiId),
}

impl ValueKind {
    /// Returns the phi handle if this value is a phi.
    #[must_use]
    pub const fn as_phi(&self) -> Option<PhiId> {
        match self {
            ValueKind::Phi(phi) => Some(*phi),
            _ => None,
        }
    }

    /// Returns `true` if this value is a phi.
    #[must_use]
    pub const fn is_phi(&self) -> bool {
        matches!(self, ValueKind::Phi(_))
    }

    /// Returns `true` if this value is a parameter.
    #[must_use]
    pub const fn is_parameter(&self) -> bool {
        matches!(self, ValueKind::Parameter(_))
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Parameter(n) => write!(f, "param{n}"),
            ValueKind::Undefined => write!(f, "undefined"),
            ValueKind::Constant(c) => write!(f, "const {c}"),
            ValueKind::Instruction { block, position } => write!(f, "{block}[{position}]"),
            ValueKind::Phi(phi) => write!(f, "{phi}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kind_queries() {
        let phi = ValueKind::Phi(PhiId::new(2));
        assert!(phi.is_phi());
        assert_eq!(phi.as_phi(), Some(PhiId::new(2)));
        assert!(ValueKind::Parameter(0).is_parameter());
        assert_eq!(ValueKind::Constant(5).as_phi(), None);
    }

    #[test]
    fn test_value_kind_display() {
        let kind = ValueKind::Instruction {
            block: BlockId::new(1),
            position: 4,
        };
        assert_eq!(kind.to_string(), "b1[4]");
        assert_eq!(ValueKind::Parameter(2).to_string(), "param2");
        assert_eq!(ValueKind::Constant(-1).to_string(), "const -1");
        assert_eq!(ValueKind::Phi(PhiId::new(0)).to_string(), "phi0");
    }
}
