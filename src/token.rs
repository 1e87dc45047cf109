use crate::storage::{LiteralPool, StringPool, StrRef};

/// A classified lexical unit.
///
/// Identifier and string-literal tokens reference the string pool; number
/// tokens carry a literal-pool index. Operator and punctuation tokens are
/// classified variants whose spelling is recovered statically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    // Literals
    Number(usize),
    Str(StrRef),

    // Names
    Ident(StrRef),

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Comparison
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Assignment
    Assign,

    // Punctuation
    LParen,
    RParen,
    Semi,

    Eof,
}

impl Token {
    /// Short kind label for token dumps.
    pub fn kind(&self) -> &'static str {
        use Token::*;
        match self {
            Number(_) => "NUM",
            Str(_) => "STRING",
            Ident(_) => "IDENT",
            Plus | Minus | Star | Slash | Percent => "OP",
            EqEq | NotEq | Lt | LtEq | Gt | GtEq => "CMP",
            Assign => "ASSIGN",
            LParen | RParen | Semi => "PUNCT",
            Eof => "EOF",
        }
    }

    /// The token's source spelling, looked up through the pools.
    ///
    /// Number tokens render their decoded literal, so `1.50` comes back as
    /// `1.5`. String tokens render the pooled bytes without the quotes, which
    /// is what conformance harnesses compare against.
    pub fn text(&self, strings: &StringPool, literals: &LiteralPool) -> String {
        use Token::*;
        match self {
            Number(index) => match literals.get(*index) {
                Some(n) => n.to_string(),
                None => String::new(),
            },
            Str(r) | Ident(r) => strings.text(*r).into_owned(),
            Plus => "+".to_string(),
            Minus => "-".to_string(),
            Star => "*".to_string(),
            Slash => "/".to_string(),
            Percent => "%".to_string(),
            EqEq => "==".to_string(),
            NotEq => "!=".to_string(),
            Lt => "<".to_string(),
            LtEq => "<=".to_string(),
            Gt => ">".to_string(),
            GtEq => ">=".to_string(),
            Assign => "=".to_string(),
            LParen => "(".to_string(),
            RParen => ")".to_string(),
            Semi => ";".to_string(),
            Eof => "EOF".to_string(),
        }
    }

    /// Human-readable description for parser diagnostics.
    pub fn describe(&self, strings: &StringPool) -> String {
        use Token::*;
        match self {
            Number(_) => "number literal".to_string(),
            Str(_) => "string literal".to_string(),
            Ident(r) => format!("identifier '{}'", strings.text(*r)),
            Eof => "end of input".to_string(),
            Assign => "'='".to_string(),
            LParen => "'('".to_string(),
            RParen => "')'".to_string(),
            Semi => "';'".to_string(),
            Plus => "'+'".to_string(),
            Minus => "'-'".to_string(),
            Star => "'*'".to_string(),
            Slash => "'/'".to_string(),
            Percent => "'%'".to_string(),
            EqEq => "'=='".to_string(),
            NotEq => "'!='".to_string(),
            Lt => "'<'".to_string(),
            LtEq => "'<='".to_string(),
            Gt => "'>'".to_string(),
            GtEq => "'>='".to_string(),
        }
    }
}
