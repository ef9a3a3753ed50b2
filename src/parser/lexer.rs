//! Scanner (tokenizer) for script source
//!
//! Produces one [`Token`] per [`Scanner::next_token`] call so the parser can
//! pull tokens on demand and rewind with [`Scanner::checkpoint`] /
//! [`Scanner::restore`]. The scanner never fails: characters it cannot
//! classify become [`TokenKind::Bad`], and the parser reports them.
//!
//! # Numeric literals
//!
//! - decimal: digits with at most one `.` and one `e`/`E` exponent (optional sign)
//! - hexadecimal: `0x` / `0X` prefix
//! - octal: a leading `0` followed by an octal digit
//!
//! Literals without a fraction or exponent are integers; everything else is a
//! double. A literal that does not parse yields `NaN` rather than an error.

use super::ast::SourceLocation;
use std::fmt;

/// Numeric literal payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Double(f64),
}

/// Token classification
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(Number),
    Str(String),

    // Names and sigils
    Identifier(String),
    Variable, // @
    Constant, // _ (before a letter)

    // Punctuation
    LParen, // (
    RParen, // )
    LBrace, // {
    RBrace, // }
    LBracket, // [
    RBracket, // ]
    Comma, // ,
    Semicolon, // ;
    Colon, // :
    ColonColon, // ::
    Dot, // .

    // Operators
    Plus, // +
    PlusPlus, // ++
    Minus, // -
    MinusMinus, // --
    Arrow, // ->
    FatArrow, // =>
    Star, // *
    Slash, // /
    Percent, // %
    Eq, // =
    EqEq, // ==
    Bang, // !
    NotEq, // !=
    Lt, // <
    Le, // <=
    LtLt, // <<
    Gt, // >
    Ge, // >=
    GtGt, // >>
    Amp, // &
    AndAnd, // &&
    Pipe, // |
    OrOr, // ||
    Caret, // ^
    Question, // ?
    NullPropagator, // ??

    /// Unclassifiable character, or `` ` `` of an unterminated string
    Bad(char),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(Number::Int(n)) => write!(f, "number {}", n),
            TokenKind::Number(Number::Double(x)) => write!(f, "number {}", x),
            TokenKind::Str(s) => write!(f, "string `{}`", s),
            TokenKind::Identifier(name) => write!(f, "identifier '{}'", name),
            TokenKind::Variable => write!(f, "'@'"),
            TokenKind::Constant => write!(f, "'_'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::ColonColon => write!(f, "'::'"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::PlusPlus => write!(f, "'++'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::MinusMinus => write!(f, "'--'"),
            TokenKind::Arrow => write!(f, "'->'"),
            TokenKind::FatArrow => write!(f, "'=>'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::Bang => write!(f, "'!'"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::LtLt => write!(f, "'<<'"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::GtGt => write!(f, "'>>'"),
            TokenKind::Amp => write!(f, "'&'"),
            TokenKind::AndAnd => write!(f, "'&&'"),
            TokenKind::Pipe => write!(f, "'|'"),
            TokenKind::OrOr => write!(f, "'||'"),
            TokenKind::Caret => write!(f, "'^'"),
            TokenKind::Question => write!(f, "'?'"),
            TokenKind::NullPropagator => write!(f, "'??'"),
            TokenKind::Bad(c) => write!(f, "unexpected character '{}'", c),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// A classified token and where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// Saved scanner cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    position: usize,
    line: usize,
    column: usize,
    current: Option<char>,
}

/// On-demand tokenizer over a source string
pub struct Scanner {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    current: Option<char>,
}

impl Scanner {
    pub fn new(input: &str) -> Self {
        let input: Vec<char> = input.chars().collect();
        let current = input.first().copied();
        Self {
            input,
            position: 0,
            line: 1,
            column: 1,
            current,
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            position: self.position,
            line: self.line,
            column: self.column,
            current: self.current,
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.position = checkpoint.position;
        self.line = checkpoint.line;
        self.column = checkpoint.column;
        self.current = checkpoint.current;
    }

    pub fn current_char(&self) -> Option<char> {
        self.current
    }

    pub fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
        self.current = self.input.get(self.position).copied();
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.current {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '/' if self.peek_char() == Some('/') => {
                    while self.current.is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Consume `second` if it follows, producing `matched`; else `single`.
    fn pair(&mut self, second: char, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.current == Some(second) {
            self.advance();
            matched
        } else {
            single
        }
    }

    /// Advance past one token and return it.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        let location = self.location();

        let Some(ch) = self.current else {
            return Token {
                kind: TokenKind::Eof,
                location,
            };
        };

        let kind = if ch.is_ascii_digit() {
            self.number()
        } else if ch.is_alphabetic() {
            self.identifier()
        } else {
            self.advance();
            match ch {
                '`' => self.string(),
                '@' => TokenKind::Variable,
                '_' if self.current.is_some_and(char::is_alphabetic) => TokenKind::Constant,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                ',' => TokenKind::Comma,
                ';' => TokenKind::Semicolon,
                '.' => TokenKind::Dot,
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '%' => TokenKind::Percent,
                '^' => TokenKind::Caret,
                ':' => self.pair(':', TokenKind::ColonColon, TokenKind::Colon),
                '?' => self.pair('?', TokenKind::NullPropagator, TokenKind::Question),
                '&' => self.pair('&', TokenKind::AndAnd, TokenKind::Amp),
                '|' => self.pair('|', TokenKind::OrOr, TokenKind::Pipe),
                '!' => self.pair('=', TokenKind::NotEq, TokenKind::Bang),
                '+' => self.pair('+', TokenKind::PlusPlus, TokenKind::Plus),
                '-' => match self.current {
                    Some('-') => {
                        self.advance();
                        TokenKind::MinusMinus
                    }
                    Some('>') => {
                        self.advance();
                        TokenKind::Arrow
                    }
                    _ => TokenKind::Minus,
                },
                '=' => match self.current {
                    Some('=') => {
                        self.advance();
                        TokenKind::EqEq
                    }
                    Some('>') => {
                        self.advance();
                        TokenKind::FatArrow
                    }
                    _ => TokenKind::Eq,
                },
                '<' => match self.current {
                    Some('=') => {
                        self.advance();
                        TokenKind::Le
                    }
                    Some('<') => {
                        self.advance();
                        TokenKind::LtLt
                    }
                    _ => TokenKind::Lt,
                },
                '>' => match self.current {
                    Some('=') => {
                        self.advance();
                        TokenKind::Ge
                    }
                    Some('>') => {
                        self.advance();
                        TokenKind::GtGt
                    }
                    _ => TokenKind::Gt,
                },
                other => TokenKind::Bad(other),
            }
        };

        Token { kind, location }
    }

    fn identifier(&mut self) -> TokenKind {
        let mut name = String::new();
        while let Some(ch) = self.current {
            if ch.is_alphanumeric() || ch == '_' {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        TokenKind::Identifier(name)
    }

    /// Backtick string; the opening backtick is already consumed.
    fn string(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(ch) = self.advance() {
            if ch == '`' {
                return TokenKind::Str(text);
            }
            text.push(ch);
        }
        TokenKind::Bad('`')
    }

    fn number(&mut self) -> TokenKind {
        if self.current == Some('0') {
            match self.peek_char() {
                Some('x') | Some('X') => {
                    self.advance();
                    self.advance();
                    let digits = self.take_while(|c| c.is_ascii_hexdigit());
                    return TokenKind::Number(radix_literal(&digits, 16));
                }
                Some(c) if ('0'..='7').contains(&c) => {
                    self.advance();
                    let digits = self.take_while(|c| ('0'..='7').contains(&c));
                    return TokenKind::Number(radix_literal(&digits, 8));
                }
                _ => {}
            }
        }

        let mut text = String::new();
        let mut seen_dot = false;
        let mut seen_exponent = false;

        while let Some(ch) = self.current {
            match ch {
                '0'..='9' => text.push(ch),
                '.' if !seen_dot && !seen_exponent => {
                    // `1.foo` is member access on 1, not a fraction
                    if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                        break;
                    }
                    seen_dot = true;
                    text.push(ch);
                }
                'e' | 'E' if !seen_exponent => {
                    seen_exponent = true;
                    text.push(ch);
                    if let Some(sign @ ('+' | '-')) = self.peek_char() {
                        self.advance();
                        text.push(sign);
                    }
                }
                _ => break,
            }
            self.advance();
        }

        let number = if seen_dot || seen_exponent {
            Number::Double(text.parse().unwrap_or(f64::NAN))
        } else {
            match text.parse::<i64>() {
                Ok(n) => Number::Int(n),
                Err(_) => Number::Double(text.parse().unwrap_or(f64::NAN)),
            }
        };
        TokenKind::Number(number)
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(ch) = self.current.filter(|&c| accept(c)) {
            text.push(ch);
            self.advance();
        }
        text
    }
}

fn radix_literal(digits: &str, radix: u32) -> Number {
    match i64::from_str_radix(digits, radix) {
        Ok(n) => Number::Int(n),
        Err(_) => Number::Double(f64::NAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut scanner = Scanner::new(source);
        let mut kinds = Vec::new();
        loop {
            let token = scanner.next_token();
            if token.kind == TokenKind::Eof {
                return kinds;
            }
            kinds.push(token.kind);
        }
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            kinds("++ -- -> => == != <= >= << >> && || :: ??"),
            vec![
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::Arrow,
                TokenKind::FatArrow,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::LtLt,
                TokenKind::GtGt,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::ColonColon,
                TokenKind::NullPropagator,
            ]
        );
        assert_eq!(kinds("? ?"), vec![TokenKind::Question, TokenKind::Question]);
    }

    #[test]
    fn test_numeric_forms() {
        assert_eq!(kinds("42"), vec![TokenKind::Number(Number::Int(42))]);
        assert_eq!(kinds("0x1F"), vec![TokenKind::Number(Number::Int(31))]);
        assert_eq!(kinds("017"), vec![TokenKind::Number(Number::Int(15))]);
        assert_eq!(kinds("1.5e3"), vec![TokenKind::Number(Number::Double(1500.0))]);
        assert_eq!(kinds("2E-2"), vec![TokenKind::Number(Number::Double(0.02))]);
        assert_eq!(
            kinds("1.2.3"),
            vec![
                TokenKind::Number(Number::Double(1.2)),
                TokenKind::Dot,
                TokenKind::Number(Number::Int(3)),
            ]
        );
    }

    #[test]
    fn test_malformed_number_is_nan() {
        match &kinds("0x")[..] {
            [TokenKind::Number(Number::Double(x))] => assert!(x.is_nan()),
            other => panic!("Expected NaN literal, got {:?}", other),
        }
    }

    #[test]
    fn test_sigils() {
        assert_eq!(
            kinds("@x _Y _"),
            vec![
                TokenKind::Variable,
                TokenKind::Identifier("x".into()),
                TokenKind::Constant,
                TokenKind::Identifier("Y".into()),
                TokenKind::Bad('_'),
            ]
        );
    }

    #[test]
    fn test_strings_and_bad_characters() {
        assert_eq!(kinds("`a b`"), vec![TokenKind::Str("a b".into())]);
        assert_eq!(kinds("`open"), vec![TokenKind::Bad('`')]);
        assert_eq!(kinds("#"), vec![TokenKind::Bad('#')]);
    }

    #[test]
    fn test_string_spans_lines() {
        let mut scanner = Scanner::new("`é\nz` x");
        assert_eq!(scanner.next_token().kind, TokenKind::Str("é\nz".into()));
        assert_eq!(scanner.next_token().location, SourceLocation::new(2, 4));
    }

    #[test]
    fn test_locations_and_comments() {
        let mut scanner = Scanner::new("a // note\n  b");
        assert_eq!(scanner.next_token().location, SourceLocation::new(1, 1));
        let b = scanner.next_token();
        assert_eq!(b.kind, TokenKind::Identifier("b".into()));
        assert_eq!(b.location, SourceLocation::new(2, 3));
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut scanner = Scanner::new("x\ny");
        let saved = scanner.checkpoint();
        scanner.next_token();
        scanner.next_token();
        scanner.restore(saved);
        assert_eq!(scanner.current_char(), Some('x'));
        assert_eq!(scanner.next_token().location, SourceLocation::new(1, 1));
    }
}
