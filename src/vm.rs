use crate::bytecode::ir::{unpack_str_ref, Program};
use crate::bytecode::op::Opcode;
use crate::lang::value::Value;
use crate::runtime_error::RuntimeError;
use crate::storage::{LiteralPool, StringPool, VarTable, MAX_STACK, MAX_VARS};

/// The execution stack: capacity-checked typed values.
///
/// Depth 0 is the empty stack; every push checks capacity, every pop and
/// peek checks non-emptiness.
#[derive(Debug)]
pub struct ValueStack {
    entries: Vec<Value>,
}

impl ValueStack {
    pub fn new() -> Self {
        ValueStack {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.entries.len() >= MAX_STACK {
            return Err(RuntimeError::StackOverflow);
        }
        self.entries.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.entries.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Value `n` positions below the top without removing it.
    pub fn peek(&self, n: usize) -> Result<Value, RuntimeError> {
        if n >= self.entries.len() {
            return Err(RuntimeError::StackUnderflow);
        }
        Ok(self.entries[self.entries.len() - 1 - n])
    }

    #[allow(dead_code)]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn values(&self) -> &[Value] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// The bytecode executor.
///
/// Borrows the pools read-only and the variable table and stack mutably;
/// straight-line scan, no branch opcodes. A fault aborts the scan and leaves
/// all state as it was at the faulting instruction.
pub struct Vm<'a> {
    strings: &'a StringPool,
    literals: &'a LiteralPool,
    vars: &'a mut VarTable,
    stack: &'a mut ValueStack,
}

impl<'a> Vm<'a> {
    pub fn new(
        strings: &'a StringPool,
        literals: &'a LiteralPool,
        vars: &'a mut VarTable,
        stack: &'a mut ValueStack,
    ) -> Self {
        Vm {
            strings,
            literals,
            vars,
            stack,
        }
    }

    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        for (ip, pair) in program.code.chunks_exact(2).enumerate() {
            let operand = pair[1];
            let opcode = Opcode::from_word(pair[0]).ok_or_else(|| RuntimeError::CorruptProgram {
                ip,
                message: format!("unknown opcode {}", pair[0]),
            })?;

            match opcode {
                Opcode::End => return Ok(()),

                Opcode::PushLit => {
                    let index = operand as usize;
                    let number =
                        self.literals
                            .get(index)
                            .ok_or_else(|| RuntimeError::CorruptProgram {
                                ip,
                                message: format!("literal index {} out of range", index),
                            })?;
                    self.stack.push(number.into())?;
                }

                Opcode::PushStr => {
                    let r = unpack_str_ref(operand);
                    if !self.strings.contains(r) {
                        return Err(RuntimeError::CorruptProgram {
                            ip,
                            message: format!("string ref {}+{} out of range", r.offset, r.len),
                        });
                    }
                    self.stack.push(Value::Str(r))?;
                }

                Opcode::Load => {
                    let slot = operand as usize;
                    if slot >= MAX_VARS {
                        return Err(RuntimeError::CorruptProgram {
                            ip,
                            message: format!("variable slot {} out of range", slot),
                        });
                    }
                    let value = self
                        .vars
                        .get(slot)
                        .ok_or(RuntimeError::UninitializedVariable { slot })?;
                    self.stack.push(value)?;
                }

                Opcode::Store => {
                    let slot = operand as usize;
                    if slot >= MAX_VARS {
                        return Err(RuntimeError::CorruptProgram {
                            ip,
                            message: format!("variable slot {} out of range", slot),
                        });
                    }
                    let value = self.stack.pop()?;
                    self.vars.set(slot, value);
                }

                op => self.binary(op)?,
            }
        }
        Ok(())
    }

    /// Executes a two-operand opcode.
    ///
    /// Operands are validated by peeking before anything is popped, so a
    /// faulting instruction leaves the stack depth exactly as it found it.
    fn binary(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        let b = self.stack.peek(0)?;
        let a = self.stack.peek(1)?;
        let result = self.apply(op, a, b)?;

        self.stack.pop()?;
        self.stack.pop()?;
        self.stack.push(result)
    }

    fn apply(&self, op: Opcode, a: Value, b: Value) -> Result<Value, RuntimeError> {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => int_op(op, x, y),
            (Value::Int(x), Value::Float(y)) => float_op(op, x as f64, y),
            (Value::Float(x), Value::Int(y)) => float_op(op, x, y as f64),
            (Value::Float(x), Value::Float(y)) => float_op(op, x, y),
            (Value::Str(ra), Value::Str(rb)) => match op {
                Opcode::Eq => Ok(bool_value(self.strings.get(ra) == self.strings.get(rb))),
                Opcode::Ne => Ok(bool_value(self.strings.get(ra) != self.strings.get(rb))),
                _ => Err(mismatch(op, a, b)),
            },
            _ => Err(mismatch(op, a, b)),
        }
    }
}

fn mismatch(op: Opcode, a: Value, b: Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        op: op.symbol(),
        lhs: a.type_name(),
        rhs: b.type_name(),
    }
}

fn bool_value(flag: bool) -> Value {
    Value::Int(flag as i64)
}

fn int_op(op: Opcode, x: i64, y: i64) -> Result<Value, RuntimeError> {
    let value = match op {
        Opcode::Add => Value::Int(x + y),
        Opcode::Sub => Value::Int(x - y),
        Opcode::Mul => Value::Int(x * y),
        Opcode::Div => {
            if y == 0 {
                return Err(RuntimeError::DivideByZero);
            }
            Value::Int(x / y)
        }
        Opcode::Mod => {
            if y == 0 {
                return Err(RuntimeError::DivideByZero);
            }
            Value::Int(x % y)
        }
        Opcode::Eq => bool_value(x == y),
        Opcode::Ne => bool_value(x != y),
        Opcode::Lt => bool_value(x < y),
        Opcode::Le => bool_value(x <= y),
        Opcode::Gt => bool_value(x > y),
        Opcode::Ge => bool_value(x >= y),
        _ => {
            return Err(RuntimeError::TypeMismatch {
                op: op.symbol(),
                lhs: "int",
                rhs: "int",
            });
        }
    };
    Ok(value)
}

fn float_op(op: Opcode, x: f64, y: f64) -> Result<Value, RuntimeError> {
    let value = match op {
        Opcode::Add => Value::Float(x + y),
        Opcode::Sub => Value::Float(x - y),
        Opcode::Mul => Value::Float(x * y),
        Opcode::Div => {
            if y == 0.0 {
                return Err(RuntimeError::DivideByZero);
            }
            Value::Float(x / y)
        }
        Opcode::Mod => {
            if y == 0.0 {
                return Err(RuntimeError::DivideByZero);
            }
            Value::Float(x % y)
        }
        Opcode::Eq => bool_value(x == y),
        Opcode::Ne => bool_value(x != y),
        Opcode::Lt => bool_value(x < y),
        Opcode::Le => bool_value(x <= y),
        Opcode::Gt => bool_value(x > y),
        Opcode::Ge => bool_value(x >= y),
        _ => {
            return Err(RuntimeError::TypeMismatch {
                op: op.symbol(),
                lhs: "float",
                rhs: "float",
            });
        }
    };
    Ok(value)
}
