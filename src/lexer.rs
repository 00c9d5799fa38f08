//! Tokenizer for the query surface syntax
//!
//! Converts input text into a token stream with 1-based line/column
//! positions. Keywords (including the function names) are matched
//! case-insensitively on whole words; identifiers are case-sensitive. Any
//! character that begins no token is an error, surfaced with its exact
//! position.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::errors::ParseError;
use crate::models::{CallName, ComparisonOp};

/// A single token with its position in the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based line of the token's first character
    pub line: u32,
    /// 1-based column of the token's first character
    pub column: u32,
}

impl Token {
    /// The surface spelling of the token, used in diagnostics.
    pub fn lexeme(&self) -> String {
        self.kind.lexeme()
    }
}

/// Every kind of token in the surface syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    /// `[A-Za-z_][A-Za-z0-9_-]*`, case-sensitive
    Identifier(String),
    /// Double-quoted string with its escapes resolved
    Str(String),
    /// Finite IEEE-754 double
    Number(f64),
    And,
    Or,
    Not,
    True,
    False,
    Null,
    /// One of the call keywords (`contains`, `startsWith`, ..., `none`)
    Function(CallName),
    /// `=`, `!=`, `>`, `>=`, `<`, `<=`
    Comparator(ComparisonOp),
    Colon,
    Comma,
    Dot,
    LParen,
    RParen,
}

impl TokenKind {
    pub fn lexeme(&self) -> String {
        match self {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Str(value) => format!("\"{value}\""),
            TokenKind::Number(n) => n.to_string(),
            TokenKind::And => "AND".to_string(),
            TokenKind::Or => "OR".to_string(),
            TokenKind::Not => "NOT".to_string(),
            TokenKind::True => "true".to_string(),
            TokenKind::False => "false".to_string(),
            TokenKind::Null => "null".to_string(),
            TokenKind::Function(name) => name.to_string(),
            TokenKind::Comparator(op) => op.symbol().to_string(),
            TokenKind::Colon => ":".to_string(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::Dot => ".".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
        }
    }
}

/// Whether `word` collides (case-insensitively) with a keyword and can
/// therefore not be used as an unquoted path segment.
pub fn is_reserved_word(word: &str) -> bool {
    classify_word(word) != WordClass::Plain
}

#[derive(PartialEq)]
enum WordClass {
    Plain,
    Keyword(TokenKind),
}

/// Case-insensitive whole-word keyword lookup.
fn classify_word(word: &str) -> WordClass {
    let lower = word.to_ascii_lowercase();
    let kind = match lower.as_str() {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        "contains" => TokenKind::Function(CallName::Contains),
        "startswith" => TokenKind::Function(CallName::StartsWith),
        "endswith" => TokenKind::Function(CallName::EndsWith),
        "any" => TokenKind::Function(CallName::Any),
        "all" => TokenKind::Function(CallName::All),
        "none" => TokenKind::Function(CallName::None),
        _ => return WordClass::Plain,
    };
    WordClass::Keyword(kind)
}

/// Tokenize `input`, rejecting the first character that begins no token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut scanner = Scanner::new(input);
    let tokens = scanner.run()?;
    trace!("[LEX] {} tokens from {} chars", tokens.len(), input.len());
    Ok(tokens)
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl Scanner {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn run(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
                continue;
            }

            let line = self.line;
            let column = self.column;
            let kind = self.scan_token(c)?;
            tokens.push(Token { kind, line, column });
        }
        Ok(tokens)
    }

    fn scan_token(&mut self, c: char) -> Result<TokenKind, ParseError> {
        match c {
            '(' => {
                self.advance();
                Ok(TokenKind::LParen)
            }
            ')' => {
                self.advance();
                Ok(TokenKind::RParen)
            }
            ':' => {
                self.advance();
                Ok(TokenKind::Colon)
            }
            ',' => {
                self.advance();
                Ok(TokenKind::Comma)
            }
            '.' => {
                self.advance();
                Ok(TokenKind::Dot)
            }
            // Multi-character comparators before single-character ones.
            '>' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(TokenKind::Comparator(ComparisonOp::Gte))
                } else {
                    Ok(TokenKind::Comparator(ComparisonOp::Gt))
                }
            }
            '<' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(TokenKind::Comparator(ComparisonOp::Lte))
                } else {
                    Ok(TokenKind::Comparator(ComparisonOp::Lt))
                }
            }
            '=' => {
                self.advance();
                Ok(TokenKind::Comparator(ComparisonOp::Eq))
            }
            '!' if self.peek_ahead(1) == Some('=') => {
                self.advance();
                self.advance();
                Ok(TokenKind::Comparator(ComparisonOp::Neq))
            }
            '"' => self.scan_string(),
            '+' | '-' if self.peek_ahead(1).is_some_and(|d| d.is_ascii_digit()) => {
                self.scan_number()
            }
            c if c.is_ascii_digit() => self.scan_number(),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.scan_word()),
            c => Err(ParseError::UnexpectedToken {
                lexeme: c.to_string(),
                line: self.line,
                column: self.column,
            }),
        }
    }

    /// Scan `[A-Za-z_][A-Za-z0-9_-]*` and classify it as a keyword or a
    /// plain identifier. Scanning the maximal word first gives keywords
    /// their word boundary: `android` is an identifier, not `AND`.
    fn scan_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match classify_word(&word) {
            WordClass::Keyword(kind) => kind,
            WordClass::Plain => TokenKind::Identifier(word),
        }
    }

    fn scan_number(&mut self) -> Result<TokenKind, ParseError> {
        let line = self.line;
        let column = self.column;
        let mut buf = String::new();

        if matches!(self.peek(), Some('+') | Some('-')) {
            buf.push(self.advance().expect("sign peeked"));
        }
        self.scan_digits(&mut buf);

        // Fractional part only when a digit follows the dot; a bare dot is
        // a path separator.
        if self.peek() == Some('.') && self.peek_ahead(1).is_some_and(|d| d.is_ascii_digit()) {
            buf.push(self.advance().expect("dot peeked"));
            self.scan_digits(&mut buf);
        }

        // Exponent only when digits follow.
        if matches!(self.peek(), Some('e') | Some('E')) {
            let digits_at = match self.peek_ahead(1) {
                Some('+') | Some('-') => 2,
                _ => 1,
            };
            if self.peek_ahead(digits_at).is_some_and(|d| d.is_ascii_digit()) {
                buf.push(self.advance().expect("exponent marker peeked"));
                if matches!(self.peek(), Some('+') | Some('-')) {
                    buf.push(self.advance().expect("exponent sign peeked"));
                }
                self.scan_digits(&mut buf);
            }
        }

        // `f64::from_str` reports overflow as infinity, not as an error;
        // reject it here so number tokens are always finite.
        let value: f64 = buf
            .parse()
            .map_err(|_| ParseError::syntax("Invalid number literal", line, column, buf.clone()))?;
        if !value.is_finite() {
            return Err(ParseError::syntax(
                "Invalid number literal",
                line,
                column,
                buf,
            ));
        }
        Ok(TokenKind::Number(value))
    }

    fn scan_digits(&mut self, buf: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                buf.push(c);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_string(&mut self) -> Result<TokenKind, ParseError> {
        let open_line = self.line;
        let open_column = self.column;
        self.advance(); // opening quote

        let mut value = String::new();
        loop {
            let Some(c) = self.advance() else {
                return Err(ParseError::syntax(
                    "Unterminated string literal",
                    open_line,
                    open_column,
                    "\"",
                ));
            };
            match c {
                '"' => return Ok(TokenKind::Str(value)),
                '\\' => value.push(self.scan_escape()?),
                c => value.push(c),
            }
        }
    }

    fn scan_escape(&mut self) -> Result<char, ParseError> {
        let line = self.line;
        let column = self.column;
        let Some(c) = self.advance() else {
            return Err(ParseError::syntax(
                "Unterminated string literal",
                line,
                column,
                "\\",
            ));
        };
        match c {
            '"' => Ok('"'),
            '\\' => Ok('\\'),
            '/' => Ok('/'),
            'b' => Ok('\u{0008}'),
            'f' => Ok('\u{000C}'),
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            'v' => Ok('\u{000B}'),
            'u' => {
                let mut code = 0u32;
                for _ in 0..4 {
                    let digit = self
                        .advance()
                        .and_then(|h| h.to_digit(16))
                        .ok_or_else(|| {
                            ParseError::syntax(
                                "Invalid unicode escape: expected four hex digits",
                                line,
                                column,
                                "\\u",
                            )
                        })?;
                    code = code * 16 + digit;
                }
                char::from_u32(code).ok_or_else(|| {
                    ParseError::syntax(
                        "Invalid unicode escape: not a scalar value",
                        line,
                        column,
                        format!("\\u{code:04X}"),
                    )
                })
            }
            other => Err(ParseError::syntax(
                format!("Invalid escape sequence '\\{other}'"),
                line,
                column,
                format!("\\{other}"),
            )),
        }
    }
}
