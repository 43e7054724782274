#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f32),
    String(std::string::String),
    Bool(bool),

    // Identifier (global variable name)
    Ident(std::string::String),

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,

    // Comparison
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    // Logic
    And,
    Or,
    Bang,

    // Delimiters
    LParen,
    RParen,
    Assign,

    // Statements
    Var,
    Print,

    Eof,
}

/// Looks up a word in the keyword table.
///
/// Returns `None` for plain identifiers.
pub fn keyword(word: &str) -> Option<Token> {
    let token = match word {
        "var" => Token::Var,
        "print" => Token::Print,
        "true" => Token::Bool(true),
        "false" => Token::Bool(false),
        "and" => Token::And,
        "or" => Token::Or,
        _ => return None,
    };
    Some(token)
}

/// Two-codepoint operators. Tried before [`single_symbol`].
pub fn double_symbol(first: char, second: char) -> Option<Token> {
    let token = match (first, second) {
        ('<', '=') => Token::LtEq,
        ('>', '=') => Token::GtEq,
        ('=', '=') => Token::EqEq,
        ('!', '=') => Token::NotEq,
        _ => return None,
    };
    Some(token)
}

pub fn single_symbol(ch: char) -> Option<Token> {
    let token = match ch {
        '+' => Token::Plus,
        '-' => Token::Minus,
        '*' => Token::Star,
        '/' => Token::Slash,
        '(' => Token::LParen,
        ')' => Token::RParen,
        '=' => Token::Assign,
        '<' => Token::Lt,
        '>' => Token::Gt,
        '!' => Token::Bang,
        _ => return None,
    };
    Some(token)
}

impl Token {
    /// Short upper-case name of the token class, used by dumps and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Token::Number(_) => "NUMBER",
            Token::String(_) => "STRING",
            Token::Bool(_) => "BOOL",
            Token::Ident(_) => "IDENT",
            Token::Plus => "PLUS",
            Token::Minus => "MINUS",
            Token::Star => "MUL",
            Token::Slash => "DIV",
            Token::EqEq => "EQ",
            Token::NotEq => "NEQ",
            Token::Lt => "LT",
            Token::Gt => "GT",
            Token::LtEq => "LEQ",
            Token::GtEq => "GEQ",
            Token::And => "AND",
            Token::Or => "OR",
            Token::Bang => "NOT",
            Token::LParen => "LPAREN",
            Token::RParen => "RPAREN",
            Token::Assign => "ASSIGN",
            Token::Var => "VAR",
            Token::Print => "PRINT",
            Token::Eof => "EOF",
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Bool(b) => write!(f, "{}", b),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Bang => write!(f, "!"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Assign => write!(f, "="),
            Token::Var => write!(f, "var"),
            Token::Print => write!(f, "print"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}
