use crate::frontend::lexer::{Span, Spanned};
use crate::frontend::parser_error::ParserError;
use crate::frontend::token::Token;
use crate::lang::ast::{Expr, Program, Stmt};

/// Binding power tiers, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Prefix,
}

type PrefixFn = fn(&mut Parser) -> Option<Expr>;
type InfixFn = fn(&mut Parser, Expr) -> Option<Expr>;

/// Prefix dispatch table.
fn prefix_rule(token: &Token) -> Option<PrefixFn> {
    match token {
        Token::Number(_) | Token::String(_) | Token::Bool(_) | Token::Ident(_) => {
            Some(Parser::parse_literal)
        }
        Token::LParen => Some(Parser::parse_group),
        Token::Minus | Token::Bang => Some(Parser::parse_unary),
        _ => None,
    }
}

/// Infix dispatch table.
fn infix_rule(token: &Token) -> Option<InfixFn> {
    match token {
        Token::Plus
        | Token::Minus
        | Token::Star
        | Token::Slash
        | Token::EqEq
        | Token::NotEq
        | Token::Lt
        | Token::Gt
        | Token::LtEq
        | Token::GtEq
        | Token::And
        | Token::Or => Some(Parser::parse_binary),
        _ => None,
    }
}

fn binding_power(token: &Token) -> Precedence {
    match token {
        Token::Or => Precedence::Or,
        Token::And => Precedence::And,
        Token::EqEq | Token::NotEq => Precedence::Equality,
        Token::Lt | Token::Gt | Token::LtEq | Token::GtEq => Precedence::Comparison,
        Token::Plus | Token::Minus => Precedence::Term,
        Token::Star | Token::Slash => Precedence::Factor,
        _ => Precedence::Lowest,
    }
}

/// Deepest expression tree the parser will build. Grouping, unary operators
/// and each operator in a left-associative chain add one level.
pub const MAX_NESTING: usize = 256;

/// Pratt parser for vmlite.
///
/// Syntax errors do not abort parsing: each one is recorded and the parser
/// carries on with the next token, so a single input can report several
/// problems. Statements that could not be completed are left out of the
/// resulting [`Program`].
///
/// Going past [`MAX_NESTING`] is the exception: it is reported once and the
/// rest of the input is abandoned.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    errors: Vec<ParserError>,
    depth: usize,
    abandoned: bool,
}

impl Parser {
    /// Creates a parser from lexer output.
    ///
    /// The token list is terminated with `Token::Eof` if the caller did not
    /// already do so, so the cursor always has a token to look at.
    pub fn new(mut tokens: Vec<Spanned>) -> Self {
        if !matches!(tokens.last(), Some(s) if s.token == Token::Eof) {
            let span = tokens
                .last()
                .map(|s| s.span)
                .unwrap_or(Span { line: 1, col: 1 });
            tokens.push(Spanned {
                token: Token::Eof,
                span,
            });
        }
        Parser {
            tokens,
            pos: 0,
            errors: Vec::new(),
            depth: 0,
            abandoned: false,
        }
    }

    fn current(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    /// Consumes the current token. The cursor never moves past `Eof`.
    fn advance(&mut self) -> Spanned {
        let spanned = self.current().clone();
        if !self.at_eof() {
            self.pos += 1;
        }
        spanned
    }

    fn error(&mut self, message: impl Into<String>) {
        if self.abandoned {
            return;
        }
        let error = ParserError::at(self.current().span, message);
        self.errors.push(error);
    }

    /// Consumes `expected` or records `message`. Returns whether it matched.
    fn expect(&mut self, expected: &Token, message: &str) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            self.error(message);
            false
        }
    }

    pub fn errors(&self) -> &[ParserError] {
        &self.errors
    }

    /// Parses statements until EOF, returning the program together with every
    /// syntax error recorded on the way.
    pub fn parse_recovering(&mut self) -> (Program, Vec<ParserError>) {
        let mut statements = Vec::new();
        while !self.at_eof() {
            if let Some(stmt) = self.statement() {
                statements.push(stmt);
            }
        }
        (Program { statements }, std::mem::take(&mut self.errors))
    }

    /// Parses a complete program, failing if any syntax error was recorded.
    pub fn parse(&mut self) -> Result<Program, Vec<ParserError>> {
        let (program, errors) = self.parse_recovering();
        if errors.is_empty() {
            Ok(program)
        } else {
            Err(errors)
        }
    }

    fn statement(&mut self) -> Option<Stmt> {
        match self.peek() {
            Token::Var => self.var_declaration(),
            Token::Print => {
                self.advance();
                self.expression(Precedence::Lowest).map(Stmt::Print)
            }
            _ => self.expression(Precedence::Lowest).map(Stmt::Expr),
        }
    }

    /// ```text
    /// var <ident> = <expr>
    /// ```
    fn var_declaration(&mut self) -> Option<Stmt> {
        self.advance(); // consume 'var'

        let name = if matches!(self.peek(), Token::Ident(_)) {
            Some(self.advance())
        } else {
            self.error("expected identifier after 'var'");
            None
        };

        self.expect(&Token::Assign, "expected '=' after variable name");
        let init = self.expression(Precedence::Lowest);

        Some(Stmt::VarDecl {
            name: name?,
            init: init?,
        })
    }

    /// Precedence climbing: one prefix parse, then infix operators for as long
    /// as they bind tighter than `min_power`.
    pub fn expression(&mut self, min_power: Precedence) -> Option<Expr> {
        let outer = self.depth;
        let expr = self.climb(min_power);
        self.depth = outer;
        expr
    }

    /// Takes one nesting level. Past the limit the error is recorded, the
    /// cursor jumps to `Eof` and every pending rule unwinds with `None`.
    fn enter(&mut self) -> bool {
        self.depth += 1;
        if self.depth <= MAX_NESTING {
            return true;
        }
        self.error("expression nested too deeply");
        self.abandoned = true;
        self.pos = self.tokens.len() - 1;
        false
    }

    fn climb(&mut self, min_power: Precedence) -> Option<Expr> {
        if !self.enter() {
            return None;
        }

        let Some(prefix) = prefix_rule(self.peek()) else {
            let message = format!("no prefix rule for token '{}'", self.peek());
            self.error(message);
            // skip the offending token so the statement loop makes progress
            self.advance();
            return None;
        };

        let mut left = prefix(self)?;

        while min_power < binding_power(self.peek()) {
            let Some(infix) = infix_rule(self.peek()) else {
                break;
            };
            if !self.enter() {
                return None;
            }
            left = infix(self, left)?;
        }

        Some(left)
    }

    fn parse_literal(&mut self) -> Option<Expr> {
        Some(Expr::Literal(self.advance()))
    }

    fn parse_group(&mut self) -> Option<Expr> {
        self.advance(); // consume '('
        let inner = self.expression(Precedence::Lowest);
        self.expect(&Token::RParen, "expected ')' after expression");
        inner
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        let op = self.advance();
        let right = self.expression(Precedence::Prefix)?;
        Some(Expr::unary(op, right))
    }

    fn parse_binary(&mut self, left: Expr) -> Option<Expr> {
        let op = self.advance();
        let power = binding_power(&op.token);
        let right = self.expression(power)?;
        Some(Expr::binary(left, op, right))
    }
}
