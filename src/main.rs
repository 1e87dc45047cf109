mod bytecode;
mod interp;
mod lang;
mod lexer;
mod parser;
mod parser_error;
mod runtime_error;
mod storage;
mod token;
mod token_dumper;
mod vm;

use std::{env, fs, io::Read, path::Path, process};

use crate::bytecode::disasm;
use crate::bytecode::ir::Image;
use crate::interp::Interp;
use crate::lang::value::Value;
use crate::storage::StringPool;
use crate::token_dumper::{pipe_line, TokenDumper};

fn main() {
    let args: Vec<String> = env::args().collect();

    let repl = args.contains(&"--repl".to_string()) || args.contains(&"-i".to_string());
    let tokens_only = args.contains(&"--tokens".to_string());
    let dump_tokens = args.contains(&"--dump-tokens".to_string());
    let no_color = args.contains(&"--no-color".to_string());
    let show_disasm = args.contains(&"--disasm".to_string());
    let image_input = args.contains(&"--image".to_string());
    let emit_path = flag_value(&args, "--emit");

    // first non-flag argument is the input; "-" reads standard input
    let input = args
        .iter()
        .skip(1)
        .filter(|a| Some(a.as_str()) != emit_path.as_deref())
        .find(|a| !a.starts_with('-') || a.as_str() == "-");

    if repl {
        run_repl(no_color);
        return;
    }

    let Some(input) = input else {
        print_usage();
        return;
    };

    if image_input {
        run_image(input, show_disasm, no_color);
        return;
    }

    let source = read_source(input);

    if tokens_only {
        print_token_line(&source);
    } else if dump_tokens {
        dump_token_listing(&source, no_color);
    } else if let Some(out) = emit_path {
        emit_image(&source, &out);
    } else {
        run_program(&source, show_disasm, no_color);
    }
}

fn print_usage() {
    println!("CINDER - expression language and bytecode VM");
    println!();
    println!("Usage:");
    println!("  cinder <file.cn>              Run a program (final stack is printed)");
    println!("  cinder -                      Read the program from standard input");
    println!("  cinder --repl, -i             Line-at-a-time session (variables persist)");
    println!("  cinder --tokens <file.cn>     Print pipe-delimited token text");
    println!("  cinder --dump-tokens <file>   Print one token per line (--no-color to disable ANSI)");
    println!("  cinder --disasm <file.cn>     Print the instruction listing before running");
    println!("  cinder --emit <out.cnb> <file.cn>   Compile to a bytecode image");
    println!("  cinder --image <file.cnb>     Run a compiled bytecode image");
}

/// Line-at-a-time loop over one interpreter: pools and stack are fresh per
/// line, variables carry over.
fn run_repl(no_color: bool) {
    let mut interp = Interp::new();
    let stdin = std::io::stdin();

    loop {
        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Failed to read standard input: {}", e);
                process::exit(1);
            }
        }

        if line.trim().is_empty() {
            continue;
        }

        match interp.run(&line) {
            Ok(()) => print_stack(&interp, no_color),
            Err(e) => eprintln!("{}", e),
        }
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let at = args.iter().position(|a| a == flag)?;
    args.get(at + 1).cloned()
}

fn read_source(input: &str) -> String {
    if input == "-" {
        let mut source = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut source) {
            eprintln!("Failed to read standard input: {}", e);
            process::exit(1);
        }
        return source;
    }

    ensure_extension(input);
    match fs::read_to_string(input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", input, e);
            process::exit(1);
        }
    }
}

fn ensure_extension(filename: &str) {
    let path = Path::new(filename);
    if path.extension().and_then(|e| e.to_str()) != Some("cn") {
        eprintln!("Error: expected a .cn file, got {}", filename);
        process::exit(1);
    }
}

fn print_token_line(source: &str) {
    let mut interp = Interp::new();
    match interp.token_texts(source) {
        Ok(texts) => println!("{}", pipe_line(&texts)),
        Err(e) => {
            eprintln!("Lex error: {}", e);
            process::exit(1);
        }
    }
}

fn dump_token_listing(source: &str, no_color: bool) {
    let mut interp = Interp::new();
    let tokens = match interp.tokenize(source) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Lex error: {}", e);
            process::exit(1);
        }
    };

    let mut dumper = TokenDumper::new();
    if no_color {
        dumper = dumper.no_color();
    }
    dumper.dump(&tokens, interp.strings(), interp.literals());
}

fn emit_image(source: &str, out: &str) {
    let mut interp = Interp::new();
    let image = match interp.compile(source) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let bytes = match image.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to encode image: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = fs::write(out, &bytes) {
        eprintln!("Failed to write '{}': {}", out, e);
        process::exit(1);
    }
    println!("wrote {} ({} bytes)", out, bytes.len());
}

fn run_image(path: &str, show_disasm: bool, no_color: bool) {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", path, e);
            process::exit(1);
        }
    };

    let image = match Image::from_bytes(&bytes) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Failed to decode image: {}", e);
            process::exit(1);
        }
    };

    let mut interp = Interp::new();
    let program = match interp.load_image(&image) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            process::exit(1);
        }
    };

    if show_disasm {
        disasm::print_program(&program);
    }

    if let Err(e) = interp.execute(&program) {
        eprintln!("Runtime error: {}", e);
        process::exit(1);
    }
    print_stack(&interp, no_color);
}

fn run_program(source: &str, show_disasm: bool, no_color: bool) {
    let mut interp = Interp::new();

    let tokens = match interp.tokenize(source) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Lex error: {}", e);
            process::exit(1);
        }
    };

    let ops = match interp.parse(tokens) {
        Ok(ops) => ops,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            process::exit(1);
        }
    };

    let program = match interp.translate(&ops) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Translate error: {}", e);
            process::exit(1);
        }
    };

    if show_disasm {
        disasm::print_program(&program);
    }

    if let Err(e) = interp.execute(&program) {
        eprintln!("Runtime error: {}", e);
        process::exit(1);
    }
    print_stack(&interp, no_color);
}

/// The observable result of a run: final depth, then one line per slot with
/// value and type tag.
fn print_stack(interp: &Interp, no_color: bool) {
    let values = interp.stack();
    println!("stack depth: {}", values.len());

    for (i, value) in values.iter().enumerate() {
        let (colr, reset) = if no_color {
            ("", "")
        } else {
            ("\x1b[36m", "\x1b[0m")
        };
        println!(
            "[{}] {}{}{} ({})",
            i,
            colr,
            format_value(*value, interp.strings()),
            reset,
            value.type_name()
        );
    }
}

fn format_value(value: Value, strings: &StringPool) -> String {
    match value {
        Value::Int(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        Value::Str(r) => format!("\"{}\"", strings.text(r)),
    }
}
