//! Parser coordinator
//!
//! This module provides the [`Parser`] struct, the parse error type, token
//! helpers and the three entry points: [`Parser::parse_expression`],
//! [`Parser::parse_statement`] and [`Parser::parse_program`].
//!
//! # Parser Architecture
//!
//! - This module: Parser state, checkpoints, helpers
//! - `expressions`: precedence ladder and the left-hand-side suffix loop
//! - `statements`: `var`, `function`, `if`/`else`, `return`, `throw`, blocks
//!
//! Parser methods are split across files using `impl Parser` blocks. The
//! parser pulls tokens from the [`Scanner`] one at a time and keeps a single
//! lookahead token; a [`ParserCheckpoint`] captures both so speculative reads
//! can be undone exactly.

use crate::parser::ast::*;
use crate::parser::keywords::Keyword;
use crate::parser::lexer::{Checkpoint, Scanner, Token, TokenKind};
use thiserror::Error;
use tracing::trace;

/// Parse failure; parsing stops at the first one
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Lexical error at {location}: unexpected character '{found}'")]
    Lexical {
        found: char,
        location: SourceLocation,
    },
    #[error("Syntax error at {location}: {message}")]
    Syntax {
        message: String,
        location: SourceLocation,
    },
}

impl ParseError {
    pub fn location(&self) -> SourceLocation {
        match self {
            ParseError::Lexical { location, .. } | ParseError::Syntax { location, .. } => *location,
        }
    }
}

/// Saved parser state: scanner cursor plus the lookahead token
#[derive(Debug, Clone)]
pub struct ParserCheckpoint {
    scanner: Checkpoint,
    current: Token,
}

/// Recursive descent parser over a [`Scanner`]
pub struct Parser {
    scanner: Scanner,
    pub(crate) current: Token,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self { scanner, current }
    }

    /// Parse a single expression; the input must end after it (a trailing
    /// `;` is allowed).
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_assignment()?;
        self.match_token(&TokenKind::Semicolon);
        self.expect_end()?;
        Ok(expr)
    }

    /// Parse the next statement, leaving the parser positioned after it.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        self.skip_terminators();
        self.statement()
    }

    /// Parse statements until end of input.
    pub fn parse_program(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_terminators();
            if self.is_at_end() {
                break;
            }
            statements.push(self.statement()?);
        }
        trace!(count = statements.len(), "parsed program");
        Ok(statements)
    }

    // ===== Checkpoints =====

    pub fn checkpoint(&self) -> ParserCheckpoint {
        ParserCheckpoint {
            scanner: self.scanner.checkpoint(),
            current: self.current.clone(),
        }
    }

    pub fn restore(&mut self, checkpoint: ParserCheckpoint) {
        self.scanner.restore(checkpoint.scanner);
        self.current = checkpoint.current;
    }

    // ===== Helper methods =====

    pub(crate) fn advance(&mut self) -> Token {
        let next = self.scanner.next_token();
        std::mem::replace(&mut self.current, next)
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.current.location
    }

    /// The keyword the current token spells, if it is one.
    pub(crate) fn current_keyword(&self) -> Option<Keyword> {
        match &self.current.kind {
            TokenKind::Identifier(name) => Keyword::lookup(name),
            _ => None,
        }
    }

    pub(crate) fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current_keyword() == Some(keyword)
    }

    pub(crate) fn skip_terminators(&mut self) {
        while self.match_token(&TokenKind::Semicolon) {}
    }

    /// Error for the current token: lexical when the scanner produced a
    /// `Bad` token, syntax otherwise.
    pub(crate) fn unexpected(&self, message: &str) -> ParseError {
        match self.current.kind {
            TokenKind::Bad(found) => ParseError::Lexical {
                found,
                location: self.current.location,
            },
            _ => ParseError::Syntax {
                message: format!("{}, found {}", message, self.current),
                location: self.current.location,
            },
        }
    }

    pub(crate) fn expect_token(&mut self, kind: &TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(message))
        }
    }

    /// A plain (non-keyword) name.
    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match &self.current.kind {
            TokenKind::Identifier(name) if !Keyword::is_keyword(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("Expected identifier")),
        }
    }

    pub(crate) fn expect_end(&mut self) -> Result<(), ParseError> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.unexpected("Expected end of input"))
        }
    }

    /// `name(.name)*` followed by any number of `[]`.
    pub(crate) fn parse_type_annotation(&mut self) -> Result<TypeAnnotation, ParseError> {
        let location = self.current_location();
        let mut name = self.expect_identifier()?;
        while self.match_token(&TokenKind::Dot) {
            name.push('.');
            name.push_str(&self.expect_identifier()?);
        }
        let mut rank = 0;
        while self.check(&TokenKind::LBracket) {
            let saved = self.checkpoint();
            self.advance();
            if self.match_token(&TokenKind::RBracket) {
                rank += 1;
            } else {
                self.restore(saved);
                break;
            }
        }
        Ok(TypeAnnotation {
            name,
            rank,
            location,
        })
    }

    /// `( name[: type], ... )`
    pub(crate) fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect_token(&TokenKind::LParen, "Expected '(' before parameters")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let name = self.expect_identifier()?;
                let annotation = if self.match_token(&TokenKind::Colon) {
                    Some(self.parse_type_annotation()?)
                } else {
                    None
                };
                params.push(Param { name, annotation });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect_token(&TokenKind::RParen, "Expected ')' after parameters")?;
        Ok(params)
    }

    /// `=> expr` (an implicit `return`) or `{ statements }`.
    pub(crate) fn parse_function_body(&mut self) -> Result<Vec<Statement>, ParseError> {
        let location = self.current_location();
        if self.match_token(&TokenKind::FatArrow) {
            let value = self.parse_assignment()?;
            return Ok(vec![Statement::return_value(Some(value), location)]);
        }
        if self.check(&TokenKind::LBrace) {
            return self.parse_block_body();
        }
        Err(self.unexpected("Expected '=>' or '{' to start a function body"))
    }

    /// `{ statements }`, returning the statements.
    pub(crate) fn parse_block_body(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect_token(&TokenKind::LBrace, "Expected '{'")?;
        let mut statements = Vec::new();
        loop {
            self.skip_terminators();
            if self.match_token(&TokenKind::RBrace) {
                return Ok(statements);
            }
            if self.is_at_end() {
                return Err(self.unexpected("Expected '}' to close block"));
            }
            statements.push(self.statement()?);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_restores_lookahead() {
        let mut parser = Parser::new("a b c");
        let saved = parser.checkpoint();
        parser.advance();
        parser.advance();
        parser.restore(saved);
        assert_eq!(parser.current.kind, TokenKind::Identifier("a".into()));
        assert_eq!(parser.expect_identifier().unwrap(), "a");
        assert_eq!(parser.expect_identifier().unwrap(), "b");
    }

    #[test]
    fn test_bad_token_is_lexical_error() {
        let err = Parser::new("1 + #").parse_expression().unwrap_err();
        assert!(matches!(err, ParseError::Lexical { found: '#', .. }));
    }

    #[test]
    fn test_type_annotation_rank() {
        let mut parser = Parser::new("System.Int32[][]");
        let annotation = parser.parse_type_annotation().unwrap();
        assert_eq!(annotation.name, "System.Int32");
        assert_eq!(annotation.rank, 2);
        assert_eq!(annotation.to_string(), "System.Int32[][]");
    }
}
