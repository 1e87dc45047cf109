use crate::lexer::Spanned;
use crate::storage::{LiteralPool, StringPool};
use crate::token::Token;

pub struct TokenDumper {
    pub color: bool,
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self { color: true }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    /// One line per token: location, kind, spelling.
    pub fn dump(&self, tokens: &[Spanned], strings: &StringPool, literals: &LiteralPool) {
        for s in tokens {
            let colr = if self.color { color_of(&s.token) } else { "" };
            let reset = if self.color { Self::RESET } else { "" };
            println!(
                "[{:02}:{:02}] {}{:<7} {}{}",
                s.span.line,
                s.span.col,
                colr,
                s.token.kind(),
                s.token.text(strings, literals),
                reset
            );
        }
    }
}

/// Token text joined by `|` — the conformance harness format.
pub fn pipe_line(texts: &[String]) -> String {
    texts.join("|")
}

fn color_of(token: &Token) -> &'static str {
    use Token::*;
    match token {
        Str(_) => TokenDumper::GRN,
        Number(_) => TokenDumper::CYN,
        Ident(_) => TokenDumper::YEL,
        Plus | Minus | Star | Slash | Percent => TokenDumper::MAG,
        EqEq | NotEq | Lt | LtEq | Gt | GtEq | Assign => TokenDumper::MAG,
        Eof => TokenDumper::DIM,
        _ => TokenDumper::RESET,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_line() {
        let texts = vec!["x".to_string(), "=".to_string(), "3".to_string()];
        assert_eq!(pipe_line(&texts), "x|=|3");
    }

    #[test]
    fn test_pipe_line_single_token() {
        assert_eq!(pipe_line(&["foo".to_string()]), "foo");
    }
}
