use crate::lang::ops::BinOp;

// =============================================================================
// OPCODE - one per instruction pair; the operand word's meaning depends on it
// =============================================================================

/// Bytecode opcodes with fixed wire discriminants.
///
/// Operand word meaning:
/// - `PushLit`: literal-pool index
/// - `PushStr`: packed string-pool reference (`offset << 32 | len`)
/// - `Load` / `Store`: variable slot
/// - everything else: unused, written as 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum Opcode {
    End = 0,
    PushLit = 1,
    PushStr = 2,
    Load = 3,
    Store = 4,

    Add = 5,
    Sub = 6,
    Mul = 7,
    Div = 8,
    Mod = 9,

    Eq = 10,
    Ne = 11,
    Lt = 12,
    Le = 13,
    Gt = 14,
    Ge = 15,
}

impl Opcode {
    /// Decodes an opcode word. `None` for anything outside the table, which
    /// the VM reports as a corrupt program.
    pub fn from_word(word: u64) -> Option<Opcode> {
        use Opcode::*;
        Some(match word {
            0 => End,
            1 => PushLit,
            2 => PushStr,
            3 => Load,
            4 => Store,
            5 => Add,
            6 => Sub,
            7 => Mul,
            8 => Div,
            9 => Mod,
            10 => Eq,
            11 => Ne,
            12 => Lt,
            13 => Le,
            14 => Gt,
            15 => Ge,
            _ => return None,
        })
    }

    pub fn word(self) -> u64 {
        self as u64
    }

    pub fn mnemonic(&self) -> &'static str {
        use Opcode::*;
        match self {
            End => "END",
            PushLit => "PUSH_LIT",
            PushStr => "PUSH_STR",
            Load => "LOAD",
            Store => "STORE",
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            Div => "DIV",
            Mod => "MOD",
            Eq => "EQ",
            Ne => "NE",
            Lt => "LT",
            Le => "LE",
            Gt => "GT",
            Ge => "GE",
        }
    }

    /// Surface spelling for runtime type errors.
    pub fn symbol(&self) -> &'static str {
        use Opcode::*;
        match self {
            End => "end",
            PushLit | PushStr => "push",
            Load => "load",
            Store => "store",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
        }
    }

}

impl From<BinOp> for Opcode {
    fn from(op: BinOp) -> Self {
        match op {
            BinOp::Add => Opcode::Add,
            BinOp::Sub => Opcode::Sub,
            BinOp::Mul => Opcode::Mul,
            BinOp::Div => Opcode::Div,
            BinOp::Mod => Opcode::Mod,
            BinOp::Eq => Opcode::Eq,
            BinOp::Ne => Opcode::Ne,
            BinOp::Lt => Opcode::Lt,
            BinOp::Le => Opcode::Le,
            BinOp::Gt => Opcode::Gt,
            BinOp::Ge => Opcode::Ge,
        }
    }
}
