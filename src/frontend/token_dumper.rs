use std::io::{self, Write};

use crate::frontend::lexer::Spanned;
use crate::frontend::token::Token;

pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints the surface text of each token
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
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
    const BLU: &'static str = "\x1b[34m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Spanned], out: &mut impl Write) -> io::Result<()> {
        for s in tokens {
            self.write_one(s, out)?;
        }
        Ok(())
    }

    fn write_one(&self, s: &Spanned, out: &mut impl Write) -> io::Result<()> {
        let line = s.span.line;
        let col = s.span.col;

        let kind = s.token.kind();
        let colr = if self.color { Self::color(&s.token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        if self.show_debug_repr {
            writeln!(
                out,
                "[{:02}:{:02}] {}{:<8} {:?}{}",
                line, col, colr, kind, s.token, reset
            )
        } else {
            writeln!(
                out,
                "[{:02}:{:02}] {}{:<8} {}{}",
                line, col, colr, kind, s.token, reset
            )
        }
    }

    fn color(t: &Token) -> &'static str {
        use Token::*;
        match t {
            Eof => Self::DIM,
            String(_) => Self::GRN,
            Number(_) | Bool(_) => Self::CYN,
            Ident(_) => Self::YEL,
            Plus | Minus | Star | Slash | Bang => Self::MAG,
            EqEq | NotEq | Lt | LtEq | Gt | GtEq | And | Or => Self::MAG,
            Var | Print => Self::BLU,
            _ => Self::RESET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;

    fn dump(source: &str, dumper: TokenDumper) -> String {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut out = Vec::new();
        dumper.dump(&tokens, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_plain_dump() {
        let text = dump("var x = 'hi'", TokenDumper::new().no_color().pretty());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[01:01] VAR      var",
                "[01:05] IDENT    x",
                "[01:07] ASSIGN   =",
                "[01:09] STRING   \"hi\"",
                "[01:13] EOF      EOF",
            ]
        );
    }

    #[test]
    fn test_debug_repr() {
        let text = dump("1.5", TokenDumper::new().no_color());
        assert!(text.starts_with("[01:01] NUMBER   Number(1.5)"));
    }

    #[test]
    fn test_color_codes() {
        let text = dump("print", TokenDumper::new());
        assert!(text.contains(TokenDumper::BLU));
        assert!(text.contains(TokenDumper::RESET));
    }
}
