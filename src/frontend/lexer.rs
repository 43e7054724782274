use thiserror::Error;

use crate::frontend::token::{self, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

/// A fatal tokenization error. Lexing stops at the first one.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{line}:{col}: {message}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl LexError {
    fn at(span: Span, message: impl Into<String>) -> Self {
        LexError {
            message: message.into(),
            line: span.line,
            col: span.col,
        }
    }
}

/// Pull-based tokenizer.
///
/// Each call to [`Lexer::next_token`] classifies the code point under the
/// cursor and returns one token. Once the input is exhausted every further
/// call yields `Token::Eof` at the end position.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        Some(ch)
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.span();
        let mut digits = String::new();
        let mut has_dot = false;

        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot {
                // A '.' only continues the number when a digit follows it
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    has_dot = true;
                    digits.push('.');
                    self.advance();
                } else {
                    break;
                }
            } else {
                break;
            }
        }

        let value: f32 = digits
            .parse()
            .map_err(|_| LexError::at(start, format!("invalid number: {}", digits)))?;
        Ok(Token::Number(value))
    }

    fn read_string(&mut self, quote: char) -> Result<Token, LexError> {
        let start = self.span();
        self.advance();

        let mut string = String::new();
        loop {
            match self.current() {
                Some(ch) if ch == quote => {
                    self.advance();
                    return Ok(Token::String(string));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.current() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some(ch @ ('\\' | '"' | '\'')) => ch,
                        Some(ch) => {
                            return Err(LexError::at(
                                self.span(),
                                format!("unknown escape sequence: \\{}", ch),
                            ));
                        }
                        None => return Err(LexError::at(start, "unterminated string literal")),
                    };
                    string.push(escaped);
                    self.advance();
                }
                Some(ch) => {
                    string.push(ch);
                    self.advance();
                }
                None => return Err(LexError::at(start, "unterminated string literal")),
            }
        }
    }

    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        token::keyword(&ident).unwrap_or(Token::Ident(ident))
    }

    fn read_symbol(&mut self, ch: char) -> Option<Token> {
        if let Some(token) = self
            .peek()
            .and_then(|next| token::double_symbol(ch, next))
        {
            self.advance();
            self.advance();
            return Some(token);
        }

        let token = token::single_symbol(ch)?;
        self.advance();
        Some(token)
    }

    /// Produces the next token, or a fatal error for unknown characters and
    /// unterminated strings.
    pub fn next_token(&mut self) -> Result<Spanned, LexError> {
        self.skip_whitespace();
        let span = self.span();

        let token = match self.current() {
            None => Token::Eof,
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch @ ('"' | '\'')) => self.read_string(ch)?,
            Some(ch) if ch.is_alphabetic() || ch == '_' => self.read_identifier(),
            Some(ch) => self
                .read_symbol(ch)
                .ok_or_else(|| LexError::at(span, format!("unexpected character: '{}'", ch)))?,
        };

        Ok(Spanned { token, span })
    }

    /// Tokenizes the whole input. The last element is always `Token::Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }
}
