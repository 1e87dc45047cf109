use crate::storage::{LiteralPool, StringPool, MAX_TOKENS};
use crate::lang::value::Number;
use crate::token::Token;

#[derive(Debug, Clone, Copy)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for LexError {}

/// Tokenizer: source bytes in, token sequence out.
///
/// Identifier and string-literal text is appended to the string pool, decoded
/// numbers to the literal pool. Pool offsets only ever advance; a failed run
/// may leave partial appends behind, which the owning interpreter discards by
/// resetting the pools before the next run.
pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
    strings: &'a mut StringPool,
    literals: &'a mut LiteralPool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, strings: &'a mut StringPool, literals: &'a mut LiteralPool) -> Self {
        Lexer {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
            strings,
            literals,
        }
    }

    fn current(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.current();
        if b == Some(b'\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        b
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn error_at(&self, span: Span, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            line: span.line,
            col: span.col,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.current() {
            if b == b' ' || b == b'\t' || b == b'\r' || b == b'\n' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self) -> Result<Token, LexError> {
        let start = self.span();
        self.advance(); // opening quote

        let source = self.source;
        let begin = self.pos;
        loop {
            match self.current() {
                Some(b'"') => {
                    let content = &source[begin..self.pos];
                    let r = self
                        .strings
                        .intern(content)
                        .ok_or_else(|| self.error_at(start, "string pool exhausted"))?;
                    self.advance(); // closing quote
                    return Ok(Token::Str(r));
                }
                Some(b'\n') | None => {
                    return Err(self.error_at(start, "unterminated string literal"));
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.span();

        let mut digits = String::new();
        while let Some(b) = self.current() {
            if b.is_ascii_digit() {
                digits.push(b as char);
                self.advance();
            } else {
                break;
            }
        }

        let mut has_dot = false;
        if self.current() == Some(b'.') {
            if self.peek().map(|b| b.is_ascii_digit()).unwrap_or(false) {
                has_dot = true;
                digits.push('.');
                self.advance();
                while let Some(b) = self.current() {
                    if b.is_ascii_digit() {
                        digits.push(b as char);
                        self.advance();
                    } else {
                        break;
                    }
                }
            } else {
                return Err(self.error_at(start, format!("malformed numeric literal: {}.", digits)));
            }
        }

        let number = if has_dot {
            let value: f64 = digits
                .parse()
                .map_err(|_| self.error_at(start, format!("malformed numeric literal: {}", digits)))?;
            Number::Float(value)
        } else {
            let value: i64 = digits
                .parse()
                .map_err(|_| self.error_at(start, format!("malformed numeric literal: {}", digits)))?;
            Number::Int(value)
        };

        let index = self
            .literals
            .push(number)
            .ok_or_else(|| self.error_at(start, "literal pool exhausted"))?;
        Ok(Token::Number(index))
    }

    fn read_identifier(&mut self) -> Result<Token, LexError> {
        let start = self.span();
        let source = self.source;
        let begin = self.pos;

        while let Some(b) = self.current() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.advance();
            } else {
                break;
            }
        }

        let name = &source[begin..self.pos];
        let r = self
            .strings
            .intern(name)
            .ok_or_else(|| self.error_at(start, "string pool exhausted"))?;
        Ok(Token::Ident(r))
    }

    fn read_operator(&mut self) -> Option<Token> {
        let b = self.current()?;
        let next = self.peek();

        let token = match (b, next) {
            (b'=', Some(b'=')) => {
                self.advance();
                self.advance();
                Token::EqEq
            }
            (b'!', Some(b'=')) => {
                self.advance();
                self.advance();
                Token::NotEq
            }
            (b'<', Some(b'=')) => {
                self.advance();
                self.advance();
                Token::LtEq
            }
            (b'>', Some(b'=')) => {
                self.advance();
                self.advance();
                Token::GtEq
            }
            (b'=', _) => {
                self.advance();
                Token::Assign
            }
            (b'<', _) => {
                self.advance();
                Token::Lt
            }
            (b'>', _) => {
                self.advance();
                Token::Gt
            }
            (b'+', _) => {
                self.advance();
                Token::Plus
            }
            (b'-', _) => {
                self.advance();
                Token::Minus
            }
            (b'*', _) => {
                self.advance();
                Token::Star
            }
            (b'/', _) => {
                self.advance();
                Token::Slash
            }
            (b'%', _) => {
                self.advance();
                Token::Percent
            }
            (b'(', _) => {
                self.advance();
                Token::LParen
            }
            (b')', _) => {
                self.advance();
                Token::RParen
            }
            (b';', _) => {
                self.advance();
                Token::Semi
            }
            _ => return None,
        };

        Some(token)
    }

    /// Tokenizes the whole input.
    ///
    /// The returned sequence always ends with `Token::Eof`; the capacity
    /// limit applies to the source tokens before it.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let span = self.span();

            let token = match self.current() {
                None => {
                    tokens.push(Spanned {
                        token: Token::Eof,
                        span,
                    });
                    break;
                }
                Some(b'"') => self.read_string()?,
                Some(b) if b.is_ascii_digit() => self.read_number()?,
                Some(b) if b.is_ascii_alphabetic() || b == b'_' => self.read_identifier()?,
                Some(b) => match self.read_operator() {
                    Some(token) => token,
                    None => {
                        return Err(
                            self.error_at(span, format!("unexpected character: '{}'", b as char))
                        );
                    }
                },
            };

            if tokens.len() >= MAX_TOKENS {
                return Err(self.error_at(span, format!("too many tokens (capacity {})", MAX_TOKENS)));
            }
            tokens.push(Spanned { token, span });
        }

        Ok(tokens)
    }
}
