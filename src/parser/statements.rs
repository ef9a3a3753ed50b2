//! Statement parsing implementation
//!
//! Statement-start dispatch looks the leading word up in the keyword table:
//! `var`, `function`, `if`, `return` and `throw` have their own sub-parsers,
//! `{` opens a block, and anything else is an expression statement. `else`
//! without `if` and the reserved `class` are syntax errors.

use crate::parser::ast::*;
use crate::parser::keywords::Keyword;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};
use std::cell::OnceCell;
use std::rc::Rc;
use tracing::trace;

impl Parser {
    pub(crate) fn statement(&mut self) -> Result<Statement, ParseError> {
        let loc = self.current_location();

        if self.check(&TokenKind::LBrace) {
            let statements = self.parse_block_body()?;
            return Ok(Statement::Block {
                statements,
                location: loc,
            });
        }

        match self.current_keyword() {
            Some(Keyword::Var) => self.parse_var_statement(),
            Some(Keyword::Function) => self.parse_function_definition(),
            Some(Keyword::If) => self.parse_if_statement(),
            Some(Keyword::Return) => {
                self.advance();
                let value = self.parse_optional_value()?;
                Ok(Statement::return_value(value, loc))
            }
            Some(Keyword::Throw) => {
                self.advance();
                let value = self.parse_optional_value()?;
                Ok(Statement::Throw {
                    value,
                    location: loc,
                })
            }
            Some(Keyword::Else) => Err(ParseError::Syntax {
                message: "'else' without matching 'if'".to_string(),
                location: loc,
            }),
            Some(Keyword::Class) => Err(ParseError::Syntax {
                message: "'class' is reserved".to_string(),
                location: loc,
            }),
            _ => Ok(Statement::Expression(self.parse_assignment()?)),
        }
    }

    /// Value of `return` / `throw`; absent before a terminator.
    fn parse_optional_value(&mut self) -> Result<Option<Expr>, ParseError> {
        if self.check(&TokenKind::Semicolon) || self.check(&TokenKind::RBrace) || self.is_at_end() {
            Ok(None)
        } else {
            Ok(Some(self.parse_assignment()?))
        }
    }

    /// `var name[: type][= init], ...`
    fn parse_var_statement(&mut self) -> Result<Statement, ParseError> {
        let loc = self.advance().location;
        let mut declarations = Vec::new();

        loop {
            let decl_loc = self.current_location();
            let name = self.expect_identifier()?;
            let annotation = if self.match_token(&TokenKind::Colon) {
                Some(self.parse_type_annotation()?)
            } else {
                None
            };
            let initializer = if self.match_token(&TokenKind::Eq) {
                Some(Box::new(self.parse_assignment()?))
            } else {
                None
            };
            declarations.push(Expr::new(
                ExprKind::Declaration {
                    name,
                    annotation,
                    initializer,
                    conversion: OnceCell::new(),
                },
                decl_loc,
            ));

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(Statement::VariableDeclaration {
            declarations,
            location: loc,
        })
    }

    /// `function name(params)[: type] (=> expr | { ... })`
    fn parse_function_definition(&mut self) -> Result<Statement, ParseError> {
        let loc = self.advance().location;
        let name = self.expect_identifier()?;
        let params = self.parse_params()?;
        let return_type = if self.match_token(&TokenKind::Colon) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        let body = self.parse_function_body()?;
        trace!(%name, params = params.len(), "parsed function definition");

        Ok(Statement::FunctionDefinition {
            signature: Signature {
                name,
                params,
                return_type,
                location: loc,
            },
            body: Rc::new(body),
            location: loc,
        })
    }

    /// `if (cond) stmt [else stmt]`
    fn parse_if_statement(&mut self) -> Result<Statement, ParseError> {
        let loc = self.advance().location;
        self.expect_token(&TokenKind::LParen, "Expected '(' after 'if'")?;
        let condition = self.parse_assignment()?;
        self.expect_token(&TokenKind::RParen, "Expected ')' after if condition")?;
        let then_branch = Box::new(self.statement()?);

        // Speculatively look past terminators for `else`; rewind if absent.
        let saved = self.checkpoint();
        self.skip_terminators();
        let else_branch = if self.check_keyword(Keyword::Else) {
            self.advance();
            Some(Box::new(self.statement()?))
        } else {
            self.restore(saved);
            None
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(source: &str) -> Vec<Statement> {
        Parser::new(source).parse_program().unwrap()
    }

    #[test]
    fn test_else_is_attached() {
        let statements = program("if (x) 1 else 2");
        assert_eq!(statements.len(), 1);
        assert!(matches!(
            &statements[0],
            Statement::If {
                else_branch: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_missing_else_rewinds() {
        let mut parser = Parser::new("if (x) 1; 2");
        let first = parser.parse_statement().unwrap();
        assert!(matches!(
            first,
            Statement::If {
                else_branch: None,
                ..
            }
        ));
        assert_eq!(parser.current.kind, TokenKind::Semicolon);
        let second = parser.parse_statement().unwrap();
        assert_eq!(second.to_string(), "2");
    }

    #[test]
    fn test_var_list() {
        let statements = program("var a: int = 1, b = `s`, c: string[]");
        match &statements[..] {
            [Statement::VariableDeclaration { declarations, .. }] => {
                assert_eq!(declarations.len(), 3);
                assert_eq!(declarations[2].to_string(), "var c: string[]");
            }
            other => panic!("Expected one declaration list, got {:?}", other),
        }
    }

    #[test]
    fn test_function_forms() {
        let statements = program("function sq(n: int): int => n * n; function f() { return; }");
        assert_eq!(statements.len(), 2);
        match &statements[0] {
            Statement::FunctionDefinition { signature, body, .. } => {
                assert_eq!(signature.name, "sq");
                assert_eq!(signature.return_type.as_ref().map(|t| t.name.as_str()), Some("int"));
                assert!(matches!(body[..], [Statement::Return { value: Some(_), .. }]));
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_reserved_words() {
        assert!(matches!(
            Parser::new("else 1").parse_program(),
            Err(ParseError::Syntax { .. })
        ));
        assert!(Parser::new("class A {}").parse_program().is_err());
    }
}
