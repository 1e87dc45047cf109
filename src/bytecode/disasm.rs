use crate::bytecode::ir::{unpack_str_ref, Program};
use crate::bytecode::op::Opcode;

/// Renders a program's instruction listing, one line per instruction:
/// index, mnemonic, and the operand where the opcode has one.
pub fn render(program: &Program) -> String {
    let mut out = String::new();

    for i in 0..program.instruction_count() {
        let Some((opcode_word, operand)) = program.instruction(i) else {
            break;
        };

        let line = match Opcode::from_word(opcode_word) {
            Some(op @ Opcode::PushStr) => {
                let r = unpack_str_ref(operand);
                format!(
                    "{:04}  {:<9} str@{}+{}\n",
                    i,
                    op.mnemonic(),
                    r.offset,
                    r.len
                )
            }
            Some(op @ (Opcode::PushLit | Opcode::Load | Opcode::Store)) => {
                format!("{:04}  {:<9} {}\n", i, op.mnemonic(), operand)
            }
            Some(op) => format!("{:04}  {}\n", i, op.mnemonic()),
            None => format!("{:04}  ??        raw={} val={}\n", i, opcode_word, operand),
        };
        out.push_str(&line);
    }

    out
}

/// Prints the listing with a header, CLI-side.
pub fn print_program(program: &Program) {
    println!("=== BYTECODE ({} instructions) ===", program.instruction_count());
    print!("{}", render(program));
}
