use crate::bytecode::ir::{Image, Program};
use crate::bytecode::translate::{TranslateError, Translator};
use crate::lang::ops::Operation;
use crate::lang::value::Value;
use crate::lexer::{LexError, Lexer, Spanned};
use crate::parser::Parser;
use crate::parser_error::ParseError;
use crate::runtime_error::RuntimeError;
use crate::storage::{LiteralPool, StringPool, VarTable};
use crate::token::Token;
use crate::vm::{ValueStack, Vm};

/// One error per pipeline stage, so callers can always tell which stage
/// rejected the input.
#[derive(Debug)]
pub enum CinderError {
    Lex(LexError),
    Parse(ParseError),
    Translate(TranslateError),
    Runtime(RuntimeError),
}

impl std::fmt::Display for CinderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CinderError::Lex(e) => write!(f, "lex error: {}", e),
            CinderError::Parse(e) => write!(f, "parse error: {}", e),
            CinderError::Translate(e) => write!(f, "translate error: {}", e),
            CinderError::Runtime(e) => write!(f, "runtime error: {}", e),
        }
    }
}

impl std::error::Error for CinderError {}

impl From<LexError> for CinderError {
    fn from(e: LexError) -> Self {
        CinderError::Lex(e)
    }
}

impl From<ParseError> for CinderError {
    fn from(e: ParseError) -> Self {
        CinderError::Parse(e)
    }
}

impl From<TranslateError> for CinderError {
    fn from(e: TranslateError) -> Self {
        CinderError::Translate(e)
    }
}

impl From<RuntimeError> for CinderError {
    fn from(e: RuntimeError) -> Self {
        CinderError::Runtime(e)
    }
}

/// The interpreter state: owns every shared storage structure and threads
/// it through the four pipeline stages.
///
/// Pools and the value stack are scoped to a single run — `run` resets them
/// on entry. The variable table persists across runs: values *and* the
/// name-to-slot bindings survive, which is what gives REPL-style callers
/// `x` back in the next program. Distinct `Interp` values are fully
/// independent; a multi-threaded host must serialize access to each one.
pub struct Interp {
    strings: StringPool,
    literals: LiteralPool,
    vars: VarTable,
    stack: ValueStack,
}

impl Interp {
    pub fn new() -> Self {
        Interp {
            strings: StringPool::new(),
            literals: LiteralPool::new(),
            vars: VarTable::new(),
            stack: ValueStack::new(),
        }
    }

    /// Stage 1: source text to tokens. Writes both pools.
    pub fn tokenize(&mut self, source: &str) -> Result<Vec<Spanned>, LexError> {
        Lexer::new(source, &mut self.strings, &mut self.literals).tokenize()
    }

    /// Stage 2: tokens to the postfix operation sequence. Binds variables.
    pub fn parse(&mut self, tokens: Vec<Spanned>) -> Result<Vec<Operation>, ParseError> {
        Parser::new(tokens, &self.strings, &mut self.vars).parse()
    }

    /// Stage 3: operations to flat bytecode.
    pub fn translate(&self, ops: &[Operation]) -> Result<Program, TranslateError> {
        Translator::new().translate(ops)
    }

    /// Stage 4: bytecode to stack/variable mutations.
    pub fn execute(&mut self, program: &Program) -> Result<(), RuntimeError> {
        Vm::new(
            &self.strings,
            &self.literals,
            &mut self.vars,
            &mut self.stack,
        )
        .run(program)
    }

    /// Runs the whole pipeline on one program.
    ///
    /// Pools and stack are reset first; variables persist from earlier runs.
    pub fn run(&mut self, source: &str) -> Result<(), CinderError> {
        self.reset_pools();
        let tokens = self.tokenize(source)?;
        let ops = self.parse(tokens)?;
        let program = self.translate(&ops)?;
        self.execute(&program)?;
        Ok(())
    }

    /// Zeroes the pool offsets and clears the stack. Does not touch the
    /// variable table.
    pub fn reset_pools(&mut self) {
        self.strings.reset();
        self.literals.reset();
        self.stack.clear();
    }

    /// Final stack contents, index 0 first — the observable result of a run.
    pub fn stack(&self) -> &[Value] {
        self.stack.values()
    }

    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    pub fn literals(&self) -> &LiteralPool {
        &self.literals
    }

    /// Current value of a variable by name, for hosts and tests.
    #[allow(dead_code)]
    pub fn var(&self, name: &str) -> Option<Value> {
        self.vars.get(self.vars.slot_of(name)?)
    }

    /// Token-text interface: each token's source spelling, in order.
    ///
    /// Conformance harnesses join these with a delimiter to verify the
    /// tokenizer in isolation.
    pub fn token_texts(&mut self, source: &str) -> Result<Vec<String>, LexError> {
        self.reset_pools();
        let tokens = self.tokenize(source)?;
        Ok(tokens
            .iter()
            .filter(|s| s.token != Token::Eof)
            .map(|s| s.token.text(&self.strings, &self.literals))
            .collect())
    }

    /// Front half of the pipeline only: source to a self-contained image
    /// carrying the code plus the pool snapshots it references.
    pub fn compile(&mut self, source: &str) -> Result<Image, CinderError> {
        self.reset_pools();
        let tokens = self.tokenize(source)?;
        let ops = self.parse(tokens)?;
        let program = self.translate(&ops)?;
        Ok(Image {
            strings: self.strings.as_bytes().to_vec(),
            literals: self.literals.values().to_vec(),
            code: program.code,
        })
    }

    /// Installs an image's pool snapshots and returns its program, ready for
    /// `execute`. Oversized snapshots are rejected the same way the VM
    /// rejects other damaged images.
    pub fn load_image(&mut self, image: &Image) -> Result<Program, RuntimeError> {
        if !self.strings.load(&image.strings) {
            return Err(RuntimeError::CorruptProgram {
                ip: 0,
                message: "string pool snapshot exceeds capacity".to_string(),
            });
        }
        if !self.literals.load(&image.literals) {
            return Err(RuntimeError::CorruptProgram {
                ip: 0,
                message: "literal pool snapshot exceeds capacity".to_string(),
            });
        }
        self.stack.clear();
        Ok(Program {
            code: image.code.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MAX_LITERALS;

    #[test]
    fn test_end_to_end_assignments() {
        let mut interp = Interp::new();
        interp.run("x = 3; y = x + 4;").unwrap();

        assert_eq!(interp.var("x"), Some(Value::Int(3)));
        assert_eq!(interp.var("y"), Some(Value::Int(7)));
        assert_eq!(interp.stack(), &[]);
    }

    #[test]
    fn test_expression_statement_leaves_result() {
        let mut interp = Interp::new();
        interp.run("1+2*3").unwrap();
        assert_eq!(interp.stack(), &[Value::Int(7)]);
    }

    #[test]
    fn test_multiple_expression_statements_stack_in_order() {
        let mut interp = Interp::new();
        interp.run("1; 2; 3;").unwrap();
        assert_eq!(
            interp.stack(),
            &[Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn test_string_expression_result() {
        let mut interp = Interp::new();
        interp.run(r#""foo""#).unwrap();

        match interp.stack() {
            [Value::Str(r)] => assert_eq!(interp.strings().text(*r), "foo"),
            other => panic!("unexpected stack: {:?}", other),
        }
    }

    #[test]
    fn test_variables_persist_across_runs() {
        let mut interp = Interp::new();
        interp.run("x = 3;").unwrap();
        interp.run("y = x + 4;").unwrap();

        assert_eq!(interp.var("x"), Some(Value::Int(3)));
        assert_eq!(interp.var("y"), Some(Value::Int(7)));
    }

    #[test]
    fn test_pools_and_stack_reset_between_runs() {
        let mut interp = Interp::new();
        interp.run(r#"msg = "hello"; 42"#).unwrap();
        assert_eq!(interp.stack().len(), 1);

        interp.run("1;").unwrap();
        // fresh pools: only the new program's literal remains
        assert_eq!(interp.stack(), &[Value::Int(1)]);
        assert_eq!(interp.strings().offset(), 0);
    }

    #[test]
    fn test_string_variable_survives_reset_only_as_slot() {
        // the variable table keeps the slot across runs, but a string value
        // references pool bytes that a reset discards; numbers survive intact
        let mut interp = Interp::new();
        interp.run("n = 41;").unwrap();
        interp.run("m = n + 1;").unwrap();
        assert_eq!(interp.var("m"), Some(Value::Int(42)));
    }

    #[test]
    fn test_stage_errors_are_distinguishable() {
        let mut interp = Interp::new();

        let err = interp.run("\"open").unwrap_err();
        assert!(matches!(err, CinderError::Lex(_)));

        let err = interp.run("1 + )").unwrap_err();
        assert!(matches!(err, CinderError::Parse(_)));

        let err = interp.run("1/0").unwrap_err();
        assert!(matches!(err, CinderError::Runtime(_)));
    }

    #[test]
    fn test_divide_by_zero_scenario() {
        let mut interp = Interp::new();
        let err = interp.run("5 / 0;").unwrap_err();
        match err {
            CinderError::Runtime(e) => assert_eq!(e, RuntimeError::DivideByZero),
            other => panic!("expected runtime error, got {}", other),
        }
        // operands were pushed, the faulting div removed nothing
        assert_eq!(interp.stack(), &[Value::Int(5), Value::Int(0)]);
    }

    #[test]
    fn test_token_texts_pipe_scenario() {
        let mut interp = Interp::new();
        let texts = interp.token_texts("x = 3; y = x + 4;").unwrap();
        assert_eq!(
            texts,
            vec!["x", "=", "3", ";", "y", "=", "x", "+", "4", ";"]
        );
        assert_eq!(texts.join("|"), "x|=|3|;|y|=|x|+|4|;");
    }

    #[test]
    fn test_token_texts_strings_render_raw() {
        let mut interp = Interp::new();
        let texts = interp.token_texts(r#""foo" 1.5"#).unwrap();
        assert_eq!(texts, vec!["foo", "1.5"]);
    }

    #[test]
    fn test_image_round_trip_matches_direct_execution() {
        let source = r#"x = 3; y = x + 4; y * 2"#;

        let mut direct = Interp::new();
        direct.run(source).unwrap();

        let mut compiler = Interp::new();
        let image = compiler.compile(source).unwrap();
        let bytes = image.to_bytes().unwrap();

        let mut runner = Interp::new();
        let image = Image::from_bytes(&bytes).unwrap();
        let program = runner.load_image(&image).unwrap();
        runner.execute(&program).unwrap();

        assert_eq!(runner.stack(), direct.stack());
        assert_eq!(runner.stack(), &[Value::Int(14)]);
    }

    #[test]
    fn test_image_with_string_survives_round_trip() {
        let mut compiler = Interp::new();
        let image = compiler.compile(r#""hi""#).unwrap();

        let mut runner = Interp::new();
        let program = runner.load_image(&image).unwrap();
        runner.execute(&program).unwrap();

        match runner.stack() {
            [Value::Str(r)] => assert_eq!(runner.strings().text(*r), "hi"),
            other => panic!("unexpected stack: {:?}", other),
        }
    }

    #[test]
    fn test_oversized_image_rejected() {
        let mut interp = Interp::new();
        let image = Image {
            strings: Vec::new(),
            literals: vec![crate::lang::value::Number::Int(0); MAX_LITERALS + 1],
            code: Vec::new(),
        };
        let err = interp.load_image(&image).unwrap_err();
        assert!(matches!(err, RuntimeError::CorruptProgram { .. }));
    }

    #[test]
    fn test_independent_interpreters() {
        let mut a = Interp::new();
        let mut b = Interp::new();

        a.run("x = 1;").unwrap();
        b.run("x = 2;").unwrap();

        assert_eq!(a.var("x"), Some(Value::Int(1)));
        assert_eq!(b.var("x"), Some(Value::Int(2)));
    }
}
