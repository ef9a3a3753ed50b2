//! Expression parsing implementation
//!
//! One method per precedence level, low to high:
//!
//! assignment `=` (right-assoc) → conditional `?:` → `||` → `&&` → `|` → `^`
//! → `&` → `== !=` → `< <= > >=` → `<< >>` → `+ -` → `* / %` → prefix unary
//! → postfix `++ --` → left-hand side.
//!
//! The left-hand side is a primary expression followed by a suffix loop that
//! attaches calls, indexers, `-> name` initializer arrows, `??` fallbacks and
//! `.` / `::` member access.

use crate::interpreter::value::Value;
use crate::parser::ast::*;
use crate::parser::keywords::Keyword;
use crate::parser::lexer::{Number, TokenKind};
use crate::parser::parse::{ParseError, Parser};
use std::cell::OnceCell;
use std::rc::Rc;

impl Parser {
    /// Parse assignment (right-associative)
    pub(crate) fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_conditional()?;

        let loc = self.current_location();
        if self.match_token(&TokenKind::Eq) {
            let value = self.parse_assignment()?;
            return Ok(Expr::assignment(expr, value, loc));
        }

        Ok(expr)
    }

    /// Parse conditional: condition ? then : else
    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let condition = self.parse_logical_or()?;

        let loc = self.current_location();
        if self.match_token(&TokenKind::Question) {
            let then_branch = self.parse_assignment()?;
            self.expect_token(&TokenKind::Colon, "Expected ':' in conditional expression")?;
            let else_branch = self.parse_assignment()?;
            return Ok(Expr::new(
                ExprKind::Ternary {
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                    conversion: OnceCell::new(),
                },
                loc,
            ));
        }

        Ok(condition)
    }

    /// Parse logical OR (||)
    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;

        loop {
            let loc = self.current_location();
            if !self.match_token(&TokenKind::OrOr) {
                return Ok(left);
            }
            let right = self.parse_logical_and()?;
            left = Expr::binary(BinOp::Or, left, right, loc);
        }
    }

    /// Parse logical AND (&&)
    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitwise_or()?;

        loop {
            let loc = self.current_location();
            if !self.match_token(&TokenKind::AndAnd) {
                return Ok(left);
            }
            let right = self.parse_bitwise_or()?;
            left = Expr::binary(BinOp::And, left, right, loc);
        }
    }

    /// Parse bitwise OR (|)
    fn parse_bitwise_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitwise_xor()?;

        loop {
            let loc = self.current_location();
            if !self.match_token(&TokenKind::Pipe) {
                return Ok(left);
            }
            let right = self.parse_bitwise_xor()?;
            left = Expr::binary(BinOp::BitOr, left, right, loc);
        }
    }

    /// Parse bitwise XOR (^)
    fn parse_bitwise_xor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitwise_and()?;

        loop {
            let loc = self.current_location();
            if !self.match_token(&TokenKind::Caret) {
                return Ok(left);
            }
            let right = self.parse_bitwise_and()?;
            left = Expr::binary(BinOp::BitXor, left, right, loc);
        }
    }

    /// Parse bitwise AND (&)
    fn parse_bitwise_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;

        loop {
            let loc = self.current_location();
            if !self.match_token(&TokenKind::Amp) {
                return Ok(left);
            }
            let right = self.parse_equality()?;
            left = Expr::binary(BinOp::BitAnd, left, right, loc);
        }
    }

    /// Parse equality (== !=)
    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;

        loop {
            let op = match self.current.kind {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::Ne,
                _ => return Ok(left),
            };
            let loc = self.advance().location;
            let right = self.parse_relational()?;
            left = Expr::binary(op, left, right, loc);
        }
    }

    /// Parse relational (< <= > >=)
    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_shift()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                _ => return Ok(left),
            };
            let loc = self.advance().location;
            let right = self.parse_shift()?;
            left = Expr::binary(op, left, right, loc);
        }
    }

    /// Parse shift (<< >>)
    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.current.kind {
                TokenKind::LtLt => BinOp::Shl,
                TokenKind::GtGt => BinOp::Shr,
                _ => return Ok(left),
            };
            let loc = self.advance().location;
            let right = self.parse_additive()?;
            left = Expr::binary(op, left, right, loc);
        }
    }

    /// Parse additive (+ -)
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(left),
            };
            let loc = self.advance().location;
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right, loc);
        }
    }

    /// Parse multiplicative (* / %)
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => return Ok(left),
            };
            let loc = self.advance().location;
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right, loc);
        }
    }

    /// Parse prefix unary (++ -- ! + -)
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current.kind {
            TokenKind::PlusPlus => UnOp::PreInc,
            TokenKind::MinusMinus => UnOp::PreDec,
            TokenKind::Bang => UnOp::Not,
            TokenKind::Plus => UnOp::Plus,
            TokenKind::Minus => UnOp::Neg,
            _ => return self.parse_postfix(),
        };
        let loc = self.advance().location;
        let operand = self.parse_unary()?;
        Ok(Expr::unary(op, operand, loc))
    }

    /// Parse postfix (++ --)
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_left_hand_side()?;

        loop {
            let op = match self.current.kind {
                TokenKind::PlusPlus => UnOp::PostInc,
                TokenKind::MinusMinus => UnOp::PostDec,
                _ => return Ok(expr),
            };
            let loc = self.advance().location;
            expr = Expr::unary(op, expr, loc);
        }
    }

    /// Parse a primary expression and its suffixes
    fn parse_left_hand_side(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();

            if self.match_token(&TokenKind::LParen) {
                let args = self.parse_expression_list(&TokenKind::RParen, "Expected ')' after arguments")?;
                expr = Expr::new(
                    ExprKind::Call {
                        target: Box::new(expr),
                        args,
                        resolved: OnceCell::new(),
                    },
                    loc,
                );
            } else if self.match_token(&TokenKind::LBracket) {
                let args = self.parse_expression_list(&TokenKind::RBracket, "Expected ']' after index")?;
                expr = Expr::new(
                    ExprKind::Index {
                        target: Box::new(expr),
                        args,
                        resolved: OnceCell::new(),
                    },
                    loc,
                );
            } else if self.match_token(&TokenKind::Arrow) {
                let target = self.parse_arrow_target()?;
                expr = Expr::assignment(target, expr, loc);
            } else if self.match_token(&TokenKind::NullPropagator) {
                let right = self.parse_unary()?;
                expr = Expr::new(
                    ExprKind::NullCoalesce {
                        left: Box::new(expr),
                        right: Box::new(right),
                    },
                    loc,
                );
            } else if self.match_token(&TokenKind::Dot) || self.match_token(&TokenKind::ColonColon) {
                let name = self.expect_name()?;
                expr = Expr::new(
                    ExprKind::MemberAccess {
                        target: Box::new(expr),
                        name,
                    },
                    loc,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    /// Target of `-> name` or `-> @name`
    fn parse_arrow_target(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        if self.match_token(&TokenKind::Variable) {
            let name = self.expect_name()?;
            return Ok(Expr::new(ExprKind::VariableRef(name), loc));
        }
        let name = self.expect_identifier()?;
        Ok(Expr::new(ExprKind::Identifier(name), loc))
    }

    /// Parse primary (literals, names, sigil references, blocks, groups, arrays)
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        match &self.current.kind {
            TokenKind::Number(number) => {
                let value = match *number {
                    Number::Int(n) => Value::Int(n),
                    Number::Double(x) => Value::Double(x),
                };
                self.advance();
                Ok(Expr::literal(value, loc))
            }
            TokenKind::Str(text) => {
                let value = Value::Str(text.clone());
                self.advance();
                Ok(Expr::literal(value, loc))
            }
            TokenKind::Variable => {
                self.advance();
                let name = self.expect_name()?;
                Ok(Expr::new(ExprKind::VariableRef(name), loc))
            }
            TokenKind::Constant => {
                self.advance();
                let name = self.expect_name()?;
                Ok(Expr::new(ExprKind::ConstantRef(name), loc))
            }
            TokenKind::LBrace => {
                let statements = self.parse_block_body()?;
                Ok(Expr::new(ExprKind::Block(statements), loc))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_assignment()?;
                self.expect_token(&TokenKind::RParen, "Expected ')' after expression")?;
                Ok(Expr::unary(UnOp::Group, inner, loc))
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.parse_expression_list(&TokenKind::RBracket, "Expected ']' after array items")?;
                Ok(Expr::new(
                    ExprKind::ArrayLiteral {
                        element_type: None,
                        items,
                        conversions: OnceCell::new(),
                    },
                    loc,
                ))
            }
            TokenKind::Identifier(name) => match Keyword::lookup(name) {
                Some(keyword) => self.parse_keyword_expression(keyword),
                None => {
                    let name = name.clone();
                    self.advance();
                    Ok(Expr::new(ExprKind::Identifier(name), loc))
                }
            },
            _ => Err(self.unexpected("Expected expression")),
        }
    }

    fn parse_keyword_expression(&mut self, keyword: Keyword) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        match keyword {
            Keyword::New => self.parse_new(),
            Keyword::True | Keyword::False => {
                self.advance();
                Ok(Expr::literal(Value::Bool(keyword == Keyword::True), loc))
            }
            Keyword::Null => {
                self.advance();
                Ok(Expr::new(ExprKind::Null, loc))
            }
            Keyword::This => {
                self.advance();
                Ok(Expr::new(ExprKind::This, loc))
            }
            Keyword::Out | Keyword::Return => {
                self.advance();
                self.match_token(&TokenKind::Variable);
                let name = self.expect_name()?;
                Ok(Expr::new(ExprKind::VariableRef(name), loc))
            }
            Keyword::Lambda => {
                self.advance();
                let params = self.parse_params()?;
                let body = self.parse_function_body()?;
                Ok(Expr::new(
                    ExprKind::AnonymousFunction {
                        params,
                        body: Rc::new(body),
                    },
                    loc,
                ))
            }
            Keyword::If
            | Keyword::Else
            | Keyword::Var
            | Keyword::Function
            | Keyword::Class
            | Keyword::Throw => Err(self.unexpected("Unexpected keyword in expression")),
        }
    }

    /// `new Type(args)`, `new Type`, or `new Type[] { items }`
    fn parse_new(&mut self) -> Result<Expr, ParseError> {
        let loc = self.advance().location;

        let type_loc = self.current_location();
        let mut type_name = self.expect_identifier()?;
        let mut target = Expr::new(ExprKind::Identifier(type_name.clone()), type_loc);
        loop {
            let member_loc = self.current_location();
            if !(self.match_token(&TokenKind::Dot) || self.match_token(&TokenKind::ColonColon)) {
                break;
            }
            let name = self.expect_identifier()?;
            type_name.push('.');
            type_name.push_str(&name);
            target = Expr::new(
                ExprKind::MemberAccess {
                    target: Box::new(target),
                    name,
                },
                member_loc,
            );
        }

        if self.check(&TokenKind::LBracket) {
            let mut rank = 0;
            while self.match_token(&TokenKind::LBracket) {
                self.expect_token(&TokenKind::RBracket, "Expected ']' in array type")?;
                rank += 1;
            }
            self.expect_token(&TokenKind::LBrace, "Expected '{' before array items")?;
            let items = self.parse_expression_list(&TokenKind::RBrace, "Expected '}' after array items")?;
            let element_type = TypeAnnotation {
                name: type_name,
                rank: rank - 1,
                location: type_loc,
            };
            return Ok(Expr::new(
                ExprKind::ArrayLiteral {
                    element_type: Some(element_type),
                    items,
                    conversions: OnceCell::new(),
                },
                loc,
            ));
        }

        let args = if self.match_token(&TokenKind::LParen) {
            self.parse_expression_list(&TokenKind::RParen, "Expected ')' after constructor arguments")?
        } else {
            Vec::new()
        };

        Ok(Expr::new(
            ExprKind::New {
                target: Box::new(target),
                args,
                resolved: OnceCell::new(),
            },
            loc,
        ))
    }

    /// Comma-separated expressions up to `close` (the opener is already
    /// consumed). An omitted element yields an `Empty` placeholder.
    pub(crate) fn parse_expression_list(
        &mut self,
        close: &TokenKind,
        message: &str,
    ) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.match_token(close) {
            return Ok(items);
        }

        loop {
            if self.check(&TokenKind::Comma) || self.check(close) {
                items.push(Expr::new(ExprKind::Empty, self.current_location()));
            } else {
                items.push(self.parse_assignment()?);
            }

            if !self.match_token(&TokenKind::Comma) {
                self.expect_token(close, message)?;
                return Ok(items);
            }
        }
    }

    /// Any word, keywords included (names after sigils and dots).
    pub(crate) fn expect_name(&mut self) -> Result<String, ParseError> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("Expected name")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Expr {
        Parser::new(source).parse_expression().unwrap()
    }

    #[test]
    fn test_precedence_ladder() {
        assert_eq!(parse("2 + 3 * 4").to_string(), "(2 + (3 * 4))");
        assert_eq!(parse("a || b && c").to_string(), "(a || (b && c))");
        assert_eq!(parse("a | b ^ c & d").to_string(), "(a | (b ^ (c & d)))");
        assert_eq!(parse("a == b < c << 1").to_string(), "(a == (b < (c << 1)))");
        assert_eq!(parse("-x++").to_string(), "(-(x++))");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(parse("a = b = 1").to_string(), "(a = (b = 1))");
        assert_eq!(parse("8 - 3 - 2").to_string(), "((8 - 3) - 2)");
    }

    #[test]
    fn test_suffix_loop() {
        assert_eq!(parse("a.b::c(1)[2]").to_string(), "a.b.c(1)[2]");
        assert_eq!(parse("@y ?? 5").to_string(), "(@y ?? 5)");
        assert_eq!(parse("@y ?? -1").to_string(), "(@y ?? (-1))");
        assert_eq!(parse("a ?? !b").to_string(), "(a ?? (!b))");
        assert_eq!(parse("1 + 2 -> x").to_string(), "(1 + (x = 2))");
    }

    #[test]
    fn test_empty_list_elements() {
        let expr = parse("f(1,,2,)");
        match &expr.kind {
            ExprKind::Call { args, .. } => {
                assert_eq!(args.len(), 4);
                assert!(matches!(args[1].kind, ExprKind::Empty));
                assert!(matches!(args[3].kind, ExprKind::Empty));
            }
            _ => panic!("Expected call"),
        }
        match &parse("g()").kind {
            ExprKind::Call { args, .. } => assert!(args.is_empty()),
            _ => panic!("Expected call"),
        }
    }

    #[test]
    fn test_keyword_forms() {
        assert_eq!(parse("new Point(1, 2)").to_string(), "new Point(1, 2)");
        match &parse("new int[] { 1, 2 }").kind {
            ExprKind::ArrayLiteral {
                element_type: Some(element),
                items,
                ..
            } => {
                assert_eq!(element.name, "int");
                assert_eq!(element.rank, 0);
                assert_eq!(items.len(), 2);
            }
            other => panic!("Expected typed array literal, got {:?}", other),
        }
        assert!(matches!(parse("out x").kind, ExprKind::VariableRef(ref n) if n == "x"));
        assert!(matches!(parse("lambda(a) => a").kind, ExprKind::AnonymousFunction { .. }));
        assert!(Parser::new("class").parse_expression().is_err());
    }

    #[test]
    fn test_trailing_input_is_rejected() {
        assert!(matches!(
            Parser::new("1 2").parse_expression(),
            Err(ParseError::Syntax { .. })
        ));
        assert!(Parser::new("(1").parse_expression().is_err());
    }
}
