use crate::lang::ops::{BinOp, Operation};
use crate::lexer::{Span, Spanned};
use crate::parser_error::ParseError;
use crate::storage::{StringPool, VarTable, MAX_OPS, MAX_VARS};
use crate::token::Token;

/// Precedence-climbing parser.
///
/// Consumes the token sequence and emits a postfix-ordered operation
/// sequence: operands (literals, variable loads) go out as soon as they are
/// seen, operators once both their operands have been emitted. The result is
/// consumable by the translator in a single left-to-right scan.
///
/// Identifiers are resolved to variable slots here — first-seen allocation
/// through the variable table — so later stages never deal in names.
///
/// Grammar:
///
/// ```text
/// program    := { statement } EOF
/// statement  := ident '=' expr terminator
///             | expr terminator
/// terminator := ';' | EOF
/// expr       := binary expression over: == !=  <  <= > >=  + -  * / %
/// primary    := number | string | ident | '(' expr ')'
/// ```
///
/// All binary operators are left-associative; `* / %` bind tightest, the
/// equality operators loosest.
pub struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Span of the most recently consumed token, for EOF error locations.
    last_span: Option<Span>,
    strings: &'a StringPool,
    vars: &'a mut VarTable,
    ops: Vec<Operation>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Spanned>, strings: &'a StringPool, vars: &'a mut VarTable) -> Self {
        Parser {
            tokens,
            pos: 0,
            last_span: None,
            strings,
            vars,
            ops: Vec::new(),
        }
    }

    fn current(&self) -> Option<Spanned> {
        self.tokens.get(self.pos).copied()
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|s| s.token)
    }

    fn peek_next(&self) -> Option<Token> {
        self.tokens.get(self.pos + 1).map(|s| s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).copied();
        if let Some(s) = spanned {
            self.last_span = Some(s.span);
        }
        self.pos += 1;
        spanned
    }

    /// Constructs a `ParseError` at the most relevant location.
    fn error(&self, message: impl Into<String>) -> ParseError {
        let span = self
            .current()
            .map(|s| s.span)
            .or(self.last_span)
            .unwrap_or(Span { line: 1, col: 1 });
        ParseError {
            message: message.into(),
            line: span.line,
            col: span.col,
        }
    }

    /// Appends one operation, enforcing the sequence capacity.
    fn emit(&mut self, op: Operation) -> Result<(), ParseError> {
        if self.ops.len() >= MAX_OPS {
            return Err(self.error(format!("operation sequence full (capacity {})", MAX_OPS)));
        }
        self.ops.push(op);
        Ok(())
    }

    fn resolve_var(&mut self, name: &str) -> Result<usize, ParseError> {
        match self.vars.resolve(name) {
            Some(slot) => Ok(slot),
            None => Err(self.error(format!("too many variables (capacity {})", MAX_VARS))),
        }
    }

    /// Parses the whole program, consuming the parser.
    pub fn parse(mut self) -> Result<Vec<Operation>, ParseError> {
        while let Some(token) = self.peek() {
            if token == Token::Eof {
                break;
            }
            self.parse_statement()?;
        }
        Ok(self.ops)
    }

    fn parse_statement(&mut self) -> Result<(), ParseError> {
        // assignment: ident '=' expr
        if let (Some(Token::Ident(r)), Some(Token::Assign)) = (self.peek(), self.peek_next()) {
            let name = self.strings.text(r).into_owned();
            let slot = self.resolve_var(&name)?;
            self.advance(); // identifier
            self.advance(); // '='
            self.parse_expr(0)?;
            self.emit(Operation::StoreVar(slot))?;
        } else {
            self.parse_expr(0)?;
        }

        match self.peek() {
            Some(Token::Semi) => {
                self.advance();
                Ok(())
            }
            Some(Token::Eof) | None => Ok(()),
            Some(Token::RParen) => Err(self.error("unmatched ')'")),
            Some(other) => Err(self.error(format!(
                "expected ';' after statement, found {}",
                other.describe(self.strings)
            ))),
        }
    }

    fn parse_expr(&mut self, min_prec: u8) -> Result<(), ParseError> {
        self.parse_primary()?;

        while let Some((op, prec)) = self.peek().and_then(binop_of) {
            if prec < min_prec {
                break;
            }
            self.advance();
            // left-associative: the right-hand side only takes tighter operators
            self.parse_expr(prec + 1)?;
            self.emit(Operation::Binary(op))?;
        }

        Ok(())
    }

    fn parse_primary(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Some(Token::Number(index)) => {
                self.advance();
                self.emit(Operation::PushLiteral(index))
            }
            Some(Token::Str(r)) => {
                self.advance();
                self.emit(Operation::PushString(r))
            }
            Some(Token::Ident(r)) => {
                let name = self.strings.text(r).into_owned();
                let slot = self.resolve_var(&name)?;
                self.advance();
                self.emit(Operation::LoadVar(slot))
            }
            Some(Token::LParen) => {
                self.advance();
                self.parse_expr(0)?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.advance();
                        Ok(())
                    }
                    _ => Err(self.error("unmatched '(', expected ')'")),
                }
            }
            Some(other) => Err(self.error(format!(
                "expected value, found {}",
                other.describe(self.strings)
            ))),
            None => Err(self.error("expected value, found end of input")),
        }
    }
}

fn binop_of(token: Token) -> Option<(BinOp, u8)> {
    let entry = match token {
        Token::EqEq => (BinOp::Eq, 1),
        Token::NotEq => (BinOp::Ne, 1),
        Token::Lt => (BinOp::Lt, 2),
        Token::LtEq => (BinOp::Le, 2),
        Token::Gt => (BinOp::Gt, 2),
        Token::GtEq => (BinOp::Ge, 2),
        Token::Plus => (BinOp::Add, 3),
        Token::Minus => (BinOp::Sub, 3),
        Token::Star => (BinOp::Mul, 4),
        Token::Slash => (BinOp::Div, 4),
        Token::Percent => (BinOp::Mod, 4),
        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::storage::LiteralPool;

    fn parse(source: &str) -> (Vec<Operation>, VarTable) {
        let mut strings = StringPool::new();
        let mut literals = LiteralPool::new();
        let tokens = Lexer::new(source, &mut strings, &mut literals)
            .tokenize()
            .unwrap();
        let mut vars = VarTable::new();
        let ops = Parser::new(tokens, &strings, &mut vars).parse().unwrap();
        (ops, vars)
    }

    fn parse_err(source: &str) -> ParseError {
        let mut strings = StringPool::new();
        let mut literals = LiteralPool::new();
        let tokens = Lexer::new(source, &mut strings, &mut literals)
            .tokenize()
            .unwrap();
        let mut vars = VarTable::new();
        Parser::new(tokens, &strings, &mut vars).parse().unwrap_err()
    }

    #[test]
    fn test_postfix_ordering_respects_precedence() {
        // 1 + 2 * 3 parses as 1 (2 3 *) +
        let (ops, _) = parse("1+2*3");
        assert_eq!(
            ops,
            vec![
                Operation::PushLiteral(0),
                Operation::PushLiteral(1),
                Operation::PushLiteral(2),
                Operation::Binary(BinOp::Mul),
                Operation::Binary(BinOp::Add),
            ]
        );
    }

    #[test]
    fn test_left_associativity() {
        // 10 - 4 - 3 parses as ((10 4 -) 3 -)
        let (ops, _) = parse("10 - 4 - 3");
        assert_eq!(
            ops,
            vec![
                Operation::PushLiteral(0),
                Operation::PushLiteral(1),
                Operation::Binary(BinOp::Sub),
                Operation::PushLiteral(2),
                Operation::Binary(BinOp::Sub),
            ]
        );
    }

    #[test]
    fn test_parens_override_precedence() {
        // (1 + 2) * 3 parses as (1 2 +) 3 *
        let (ops, _) = parse("(1+2)*3");
        assert_eq!(
            ops,
            vec![
                Operation::PushLiteral(0),
                Operation::PushLiteral(1),
                Operation::Binary(BinOp::Add),
                Operation::PushLiteral(2),
                Operation::Binary(BinOp::Mul),
            ]
        );
    }

    #[test]
    fn test_comparison_binds_looser_than_arithmetic() {
        // 1 + 2 < 4 parses as (1 2 +) 4 <
        let (ops, _) = parse("1 + 2 < 4");
        assert_eq!(
            ops,
            vec![
                Operation::PushLiteral(0),
                Operation::PushLiteral(1),
                Operation::Binary(BinOp::Add),
                Operation::PushLiteral(2),
                Operation::Binary(BinOp::Lt),
            ]
        );
    }

    #[test]
    fn test_assignment_emits_store_last() {
        let (ops, vars) = parse("x = 3;");
        assert_eq!(
            ops,
            vec![Operation::PushLiteral(0), Operation::StoreVar(0)]
        );
        assert_eq!(vars.slot_of("x"), Some(0));
    }

    #[test]
    fn test_two_statement_program() {
        // the end-to-end shape from the conformance scenario
        let (ops, vars) = parse("x = 3; y = x + 4;");
        assert_eq!(
            ops,
            vec![
                Operation::PushLiteral(0),
                Operation::StoreVar(0),
                Operation::LoadVar(0),
                Operation::PushLiteral(1),
                Operation::Binary(BinOp::Add),
                Operation::StoreVar(1),
            ]
        );
        assert_eq!(vars.slot_of("x"), Some(0));
        assert_eq!(vars.slot_of("y"), Some(1));
    }

    #[test]
    fn test_slot_reuse_across_statements() {
        let (_, vars) = parse("a = 1; b = 2; a = b;");
        assert_eq!(vars.bound(), 2);
        assert_eq!(vars.slot_of("a"), Some(0));
        assert_eq!(vars.slot_of("b"), Some(1));
    }

    #[test]
    fn test_string_expression_statement() {
        let (ops, _) = parse(r#""foo""#);
        assert!(matches!(ops[0], Operation::PushString(_)));
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn test_unbalanced_open_paren() {
        let err = parse_err("(1 + 2");
        assert!(err.message.contains("unmatched '('"));
    }

    #[test]
    fn test_unbalanced_close_paren() {
        let err = parse_err("1 + 2)");
        assert!(err.message.contains("unmatched ')'"));
    }

    #[test]
    fn test_operator_where_value_expected() {
        let err = parse_err("1 + * 2");
        assert!(err.message.contains("expected value"));
    }

    #[test]
    fn test_trailing_operator() {
        let err = parse_err("1 +");
        assert!(err.message.contains("expected value"));
    }

    #[test]
    fn test_missing_terminator() {
        let err = parse_err("x = 1 y = 2");
        assert!(err.message.contains("expected ';'"));
    }

    #[test]
    fn test_error_location_from_last_span() {
        // error at end of input still carries a real location
        let err = parse_err("1 +");
        assert!(err.line >= 1 && err.col > 1, "got {}:{}", err.line, err.col);
    }

    #[test]
    fn test_slot_exhaustion_reported_as_parse_error() {
        // the token cap keeps 257 identifiers out of one program, but slots
        // accumulate across runs; a pre-populated table exhausts the same way
        let mut strings = StringPool::new();
        let mut literals = LiteralPool::new();
        let tokens = Lexer::new("fresh = 1;", &mut strings, &mut literals)
            .tokenize()
            .unwrap();

        let mut vars = VarTable::new();
        for i in 0..crate::storage::MAX_VARS {
            vars.resolve(&format!("v{}", i)).unwrap();
        }

        let err = Parser::new(tokens, &strings, &mut vars).parse().unwrap_err();
        assert!(err.message.contains("too many variables"));
    }

    #[test]
    fn test_variable_slot_exhaustion() {
        // 256 distinct identifiers fit; references, not assignments, so each
        // statement is one token pair. Use short generated names.
        let mut source = String::new();
        for i in 0..85 {
            source.push_str(&format!("v{} = {};", i, i));
        }
        // 85 assignments parse fine (well under both token and slot caps)
        let (_, vars) = parse(&source);
        assert_eq!(vars.bound(), 85);
    }
}
