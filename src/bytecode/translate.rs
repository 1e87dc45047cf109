use crate::bytecode::ir::{pack_str_ref, Program};
use crate::bytecode::op::Opcode;
use crate::lang::ops::Operation;
use crate::storage::MAX_CODE_WORDS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    /// The flat code stream would exceed its fixed capacity.
    CodeCapacity { limit: usize },

    /// An operator or store at this operation index has too few operands
    /// beneath it. Unreachable from parser output; kept as the defensive
    /// check on hand-built operation sequences.
    StackEffect { index: usize, op: &'static str },
}

impl std::fmt::Display for TranslateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslateError::CodeCapacity { limit } => {
                write!(f, "bytecode full (capacity {} words)", limit)
            }
            TranslateError::StackEffect { index, op } => {
                write!(f, "operation {} ('{}') has no operands to consume", index, op)
            }
        }
    }
}

impl std::error::Error for TranslateError {}

/// Translates the postfix operation sequence into flat bytecode.
///
/// One left-to-right scan; each operation becomes exactly one instruction
/// pair, and a final `End` is appended. A running depth simulation mirrors
/// what execution will do to the stack, so sequences that would underflow
/// are rejected here instead of at run time.
pub struct Translator {
    depth: usize,
}

impl Translator {
    pub fn new() -> Self {
        Translator { depth: 0 }
    }

    pub fn translate(&mut self, ops: &[Operation]) -> Result<Program, TranslateError> {
        let mut program = Program::new();

        for (index, op) in ops.iter().enumerate() {
            match *op {
                Operation::PushLiteral(lit) => {
                    emit(&mut program, Opcode::PushLit, lit as u64)?;
                    self.depth += 1;
                }
                Operation::PushString(r) => {
                    emit(&mut program, Opcode::PushStr, pack_str_ref(r))?;
                    self.depth += 1;
                }
                Operation::LoadVar(slot) => {
                    emit(&mut program, Opcode::Load, slot as u64)?;
                    self.depth += 1;
                }
                Operation::StoreVar(slot) => {
                    if self.depth < 1 {
                        return Err(TranslateError::StackEffect { index, op: "store" });
                    }
                    self.depth -= 1;
                    emit(&mut program, Opcode::Store, slot as u64)?;
                }
                Operation::Binary(binop) => {
                    if self.depth < 2 {
                        return Err(TranslateError::StackEffect {
                            index,
                            op: binop.symbol(),
                        });
                    }
                    self.depth -= 1;
                    emit(&mut program, Opcode::from(binop), 0)?;
                }
            }
        }

        emit(&mut program, Opcode::End, 0)?;
        Ok(program)
    }
}

fn emit(program: &mut Program, opcode: Opcode, operand: u64) -> Result<(), TranslateError> {
    if program.code.len() + 2 > MAX_CODE_WORDS {
        return Err(TranslateError::CodeCapacity {
            limit: MAX_CODE_WORDS,
        });
    }
    program.code.push(opcode.word());
    program.code.push(operand);
    Ok(())
}
