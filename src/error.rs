use thiserror::Error;

use crate::ir::{BlockId, ValueId};

macro_rules! invariant_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::InvariantViolation {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::InvariantViolation {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// None of these errors are recoverable inside the graph: a caller that receives an `Err`
/// from any graph operation is expected to drop the whole [`crate::ir::Graph`] and fall back
/// to a non-optimizing strategy. The graph never ends up half-analyzed from the caller's
/// point of view.
///
/// # Error Categories
///
/// ## Builder Bugs
/// - [`Error::InvariantViolation`] - Predecessor/successor bookkeeping, phi arity or
///   environment shape is inconsistent. Always signals a bug in the code feeding the graph.
/// - [`Error::InvalidBlock`] / [`Error::InvalidValue`] - A handle that does not belong to
///   this graph was passed in.
///
/// ## Unsupported Input
/// - [`Error::UnsupportedConstruct`] - The control flow cannot be expressed in this IR,
///   for example an irreducible loop.
///
/// ## Budgets
/// - [`Error::ResourceExhaustion`] - A limit from [`crate::GraphConfig`] was exceeded.
///
/// # Examples
///
/// ```rust
/// use irgraph::{Error, ir::Graph};
///
/// let mut graph = Graph::new(1, 0, 1);
/// let entry = graph.entry();
/// graph.finish_exit(entry, irgraph::ir::Terminator::Return(None))?;
///
/// match graph.add_instruction(entry, irgraph::ir::Opcode::new("nop"), vec![]) {
///     Err(Error::InvariantViolation { message, .. }) => println!("builder bug: {message}"),
///     Err(e) => println!("other error: {e}"),
///     Ok(_) => unreachable!(),
/// }
/// # Ok::<(), irgraph::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A structural invariant of the graph was violated.
    ///
    /// This covers every inconsistency the builder can cause: mutating a finished block,
    /// a phi whose input count disagrees with its block's predecessor count, merging two
    /// environments of different length, a loop header without predecessors, or a broken
    /// dominator chain. The error includes the source location where the violation was
    /// detected.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the violated invariant
    /// * `file` - Source file where the violation was detected
    /// * `line` - Source line where the violation was detected
    #[error("Invariant violation - {file}:{line}: {message}")]
    InvariantViolation {
        /// The message to be printed for the violation
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The control flow handed to the graph cannot be represented.
    ///
    /// Raised for irreducible control flow: a loop entered from more than one forward
    /// edge, or a backward edge landing on a block that is not a loop header.
    #[error("Unsupported construct - {0}")]
    UnsupportedConstruct(String),

    /// A configured construction budget was exceeded.
    #[error("Resource limit exceeded - {resource} (limit {limit})")]
    ResourceExhaustion {
        /// Which budget was exceeded
        resource: &'static str,
        /// The configured limit
        limit: usize,
    },

    /// The block handle does not refer to a block of this graph.
    #[error("Invalid block handle - {0}")]
    InvalidBlock(BlockId),

    /// The value handle does not refer to a value of this graph.
    #[error("Invalid value handle - {0}")]
    InvalidValue(ValueId),
}
