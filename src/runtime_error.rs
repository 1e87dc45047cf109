use crate::storage::MAX_STACK;

/// Execution faults. Any of these aborts the run immediately; variable
/// stores made before the fault stay in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    StackOverflow,
    StackUnderflow,

    /// A `Load` of a slot that has never been stored to.
    UninitializedVariable { slot: usize },

    /// Operand types the operator does not accept.
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    DivideByZero,

    /// Undecodable opcode or out-of-range operand. Translator output never
    /// triggers this; images loaded from disk can.
    CorruptProgram { ip: usize, message: String },
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::StackOverflow => {
                write!(f, "stack overflow (capacity {})", MAX_STACK)
            }
            RuntimeError::StackUnderflow => write!(f, "stack underflow"),
            RuntimeError::UninitializedVariable { slot } => {
                write!(f, "variable slot {} read before assignment", slot)
            }
            RuntimeError::TypeMismatch { op, lhs, rhs } => {
                write!(f, "cannot apply '{}' to {} and {}", op, lhs, rhs)
            }
            RuntimeError::DivideByZero => write!(f, "division by zero"),
            RuntimeError::CorruptProgram { ip, message } => {
                write!(f, "corrupt bytecode at instruction {}: {}", ip, message)
            }
        }
    }
}

impl std::error::Error for RuntimeError {}
