//! Recursive-descent parser with Pratt expression parsing.
//!
//! `parse_program` builds a fresh parser per call; nothing is shared
//! between invocations. Semicolons are accepted but not required at
//! statement end.

use thiserror::Error;

use crate::ast::{
    AssignOp, BinaryOp, DeclKind, Declarator, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp,
};
use crate::lexer::tokenize;
use crate::token::{Span, Token, TokenKind};

/// Maximum statement/expression nesting depth. Far beyond anything a real
/// program needs, but low enough that recursive descent never exhausts the
/// native stack on adversarial input.
const MAX_NESTING_DEPTH: usize = 200;

/// Parse/lex failure with 1-based line and column diagnostics.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    /// Builds an error pointing at a byte offset into the source.
    pub fn at(source: &str, offset: usize, message: String) -> SyntaxError {
        let clamped = offset.min(source.len());
        let mut line = 1;
        let mut column = 1;
        for ch in source[..clamped].chars() {
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        SyntaxError {
            message,
            line,
            column,
        }
    }
}

/// Parses a complete source text into a [`Program`].
pub fn parse_program(source: &str) -> Result<Program, SyntaxError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
    };
    let mut body = Vec::new();
    while !parser.check(&TokenKind::Eof) {
        body.push(parser.parse_stmt()?);
    }
    Ok(Program { body })
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    // -----------------------------------------------------------------------
    // Token plumbing
    // -----------------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn previous_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, context: &str) -> Result<Token, SyntaxError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!(
                "expected {} {context}, found {}",
                kind.describe(),
                self.peek().kind.describe()
            )))
        }
    }

    fn expect_ident(&mut self, context: &str) -> Result<(String, Span), SyntaxError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let span = self.peek().span;
                self.advance();
                Ok((name, span))
            }
            other => Err(self.error_here(format!(
                "expected identifier {context}, found {}",
                other.describe()
            ))),
        }
    }

    fn error_here(&self, message: String) -> SyntaxError {
        SyntaxError::at(self.source, self.peek().span.start, message)
    }

    /// Bounds recursive descent so deeply nested input fails with a
    /// diagnostic instead of overflowing the native stack.
    fn descend(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            Err(self.error_here(format!(
                "input is nested more than {MAX_NESTING_DEPTH} levels deep"
            )))
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn parse_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        self.descend()?;
        let result = self.parse_stmt_unchecked();
        self.depth -= 1;
        result
    }

    fn parse_stmt_unchecked(&mut self) -> Result<Stmt, SyntaxError> {
        match &self.peek().kind {
            TokenKind::Let | TokenKind::Const | TokenKind::Var => self.parse_decl(true),
            TokenKind::Function => self.parse_function_decl(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Return => {
                let start = self.advance().span;
                let value = if self.check(&TokenKind::Semi)
                    || self.check(&TokenKind::RBrace)
                    || self.check(&TokenKind::Eof)
                {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.eat(&TokenKind::Semi);
                Ok(Stmt {
                    kind: StmtKind::Return(value),
                    span: start.union(self.previous_span()),
                })
            }
            TokenKind::Break => {
                let span = self.advance().span;
                self.eat(&TokenKind::Semi);
                Ok(Stmt {
                    kind: StmtKind::Break,
                    span: span.union(self.previous_span()),
                })
            }
            TokenKind::Continue => {
                let span = self.advance().span;
                self.eat(&TokenKind::Semi);
                Ok(Stmt {
                    kind: StmtKind::Continue,
                    span: span.union(self.previous_span()),
                })
            }
            _ => self.parse_simple_stmt(true),
        }
    }

    fn parse_decl(&mut self, consume_semi: bool) -> Result<Stmt, SyntaxError> {
        let keyword = self.advance();
        let decl_kind = match keyword.kind {
            TokenKind::Let => DeclKind::Let,
            TokenKind::Const => DeclKind::Const,
            TokenKind::Var => DeclKind::Var,
            _ => unreachable!("parse_decl called on a non-declaration token"),
        };

        let mut declarators = Vec::new();
        loop {
            let (name, _) = self.expect_ident("in declaration")?;
            let init = if self.eat(&TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            declarators.push(Declarator { name, init });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        if decl_kind == DeclKind::Const {
            if let Some(declarator) = declarators.iter().find(|d| d.init.is_none()) {
                return Err(self.error_here(format!(
                    "missing initializer in const declaration of '{}'",
                    declarator.name
                )));
            }
        }
        if consume_semi {
            self.eat(&TokenKind::Semi);
        }
        Ok(Stmt {
            kind: StmtKind::Decl {
                decl_kind,
                declarators,
            },
            span: keyword.span.union(self.previous_span()),
        })
    }

    fn parse_function_decl(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.advance().span;
        let (name, _) = self.expect_ident("after 'function'")?;
        self.expect(&TokenKind::LParen, "after function name")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let (param, _) = self.expect_ident("in parameter list")?;
                params.push(param);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "after parameters")?;
        self.expect(&TokenKind::LBrace, "to open function body")?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            body.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::RBrace, "to close function body")?;
        Ok(Stmt {
            kind: StmtKind::FunctionDecl { name, params, body },
            span: start.union(self.previous_span()),
        })
    }

    fn parse_if(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.advance().span;
        self.expect(&TokenKind::LParen, "after 'if'")?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "after if condition")?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt {
            kind: StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
            span: start.union(self.previous_span()),
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.advance().span;
        self.expect(&TokenKind::LParen, "after 'while'")?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "after while condition")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt {
            kind: StmtKind::While { cond, body },
            span: start.union(self.previous_span()),
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.advance().span;
        self.expect(&TokenKind::LParen, "after 'for'")?;

        let init = if self.check(&TokenKind::Semi) {
            None
        } else if matches!(
            self.peek().kind,
            TokenKind::Let | TokenKind::Const | TokenKind::Var
        ) {
            Some(Box::new(self.parse_decl(false)?))
        } else {
            Some(Box::new(self.parse_simple_stmt(false)?))
        };
        self.expect(&TokenKind::Semi, "after for-loop initializer")?;

        let cond = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&TokenKind::Semi, "after for-loop condition")?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_simple_stmt(false)?))
        };
        self.expect(&TokenKind::RParen, "after for-loop header")?;

        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt {
            kind: StmtKind::For {
                init,
                cond,
                update,
                body,
            },
            span: start.union(self.previous_span()),
        })
    }

    fn parse_block(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.advance().span;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            body.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::RBrace, "to close block")?;
        Ok(Stmt {
            kind: StmtKind::Block(body),
            span: start.union(self.previous_span()),
        })
    }

    /// Assignment or expression statement. Used at statement level and in
    /// for-loop headers (where the semicolon belongs to the header).
    fn parse_simple_stmt(&mut self, consume_semi: bool) -> Result<Stmt, SyntaxError> {
        let start = self.peek().span;
        let expr = self.parse_expr()?;

        let assign_op = match self.peek().kind {
            TokenKind::Assign => Some(AssignOp::Assign),
            TokenKind::PlusAssign => Some(AssignOp::Add),
            TokenKind::MinusAssign => Some(AssignOp::Sub),
            TokenKind::StarAssign => Some(AssignOp::Mul),
            TokenKind::SlashAssign => Some(AssignOp::Div),
            _ => None,
        };

        let kind = if let Some(op) = assign_op {
            self.validate_assign_target(&expr)?;
            self.advance();
            let value = self.parse_expr()?;
            StmtKind::Assign {
                target: expr,
                op,
                value,
            }
        } else {
            StmtKind::Expr(expr)
        };

        if consume_semi {
            self.eat(&TokenKind::Semi);
        }
        Ok(Stmt {
            kind,
            span: start.union(self.previous_span()),
        })
    }

    /// Valid assignment targets: identifiers, indexed elements, and array
    /// patterns built from them (destructuring).
    fn validate_assign_target(&self, expr: &Expr) -> Result<(), SyntaxError> {
        match &expr.kind {
            ExprKind::Ident(_) | ExprKind::Index { .. } => Ok(()),
            ExprKind::Array(elements) => {
                for element in elements {
                    self.validate_assign_target(element)?;
                }
                Ok(())
            }
            _ => Err(SyntaxError::at(
                self.source,
                expr.span.start,
                "invalid assignment target".to_string(),
            )),
        }
    }

    // -----------------------------------------------------------------------
    // Expressions (Pratt)
    // -----------------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.descend()?;
        let result = self.parse_binary(0);
        self.depth -= 1;
        result
    }

    fn parse_binary(&mut self, min_power: u8) -> Result<Expr, SyntaxError> {
        // Each operator application deepens the tree, so iterative chains
        // (`1 + 1 + ...`) count against the nesting bound too.
        let mut wraps = 0usize;
        let result = self.parse_binary_chain(min_power, &mut wraps);
        self.depth -= wraps;
        result
    }

    fn parse_binary_chain(
        &mut self,
        min_power: u8,
        wraps: &mut usize,
    ) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let (op, power) = match self.peek().kind {
                TokenKind::OrOr => (BinaryOp::Or, 1),
                TokenKind::AndAnd => (BinaryOp::And, 2),
                TokenKind::EqEq => (BinaryOp::Eq, 3),
                TokenKind::NotEq => (BinaryOp::NotEq, 3),
                TokenKind::EqEqEq => (BinaryOp::StrictEq, 3),
                TokenKind::NotEqEq => (BinaryOp::StrictNotEq, 3),
                TokenKind::Lt => (BinaryOp::Lt, 4),
                TokenKind::Le => (BinaryOp::Le, 4),
                TokenKind::Gt => (BinaryOp::Gt, 4),
                TokenKind::Ge => (BinaryOp::Ge, 4),
                TokenKind::Plus => (BinaryOp::Add, 5),
                TokenKind::Minus => (BinaryOp::Sub, 5),
                TokenKind::Star => (BinaryOp::Mul, 6),
                TokenKind::Slash => (BinaryOp::Div, 6),
                TokenKind::Percent => (BinaryOp::Rem, 6),
                _ => break,
            };
            if power < min_power {
                break;
            }
            self.descend()?;
            *wraps += 1;
            self.advance();
            let rhs = self.parse_binary(power + 1)?;
            let span = lhs.span.union(rhs.span);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.descend()?;
            let start = self.advance().span;
            let operand = self.parse_unary();
            self.depth -= 1;
            let operand = operand?;
            let span = start.union(operand.span);
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut wraps = 0usize;
        let result = self.parse_postfix_chain(&mut wraps);
        self.depth -= wraps;
        result
    }

    fn parse_postfix_chain(&mut self, wraps: &mut usize) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::LParen => {
                    self.descend()?;
                    *wraps += 1;
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&TokenKind::RParen, "after call arguments")?;
                    let span = expr.span.union(self.previous_span());
                    expr = Expr {
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    };
                }
                TokenKind::LBracket => {
                    self.descend()?;
                    *wraps += 1;
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket, "after index expression")?;
                    let span = expr.span.union(self.previous_span());
                    expr = Expr {
                        kind: ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    };
                }
                TokenKind::Dot => {
                    self.descend()?;
                    *wraps += 1;
                    self.advance();
                    let (property, prop_span) = self.expect_ident("after '.'")?;
                    let span = expr.span.union(prop_span);
                    expr = Expr {
                        kind: ExprKind::Member {
                            object: Box::new(expr),
                            property,
                        },
                        span,
                    };
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    self.descend()?;
                    *wraps += 1;
                    let increment = self.peek().kind == TokenKind::PlusPlus;
                    if !matches!(expr.kind, ExprKind::Ident(_) | ExprKind::Index { .. }) {
                        return Err(self.error_here(
                            "invalid increment/decrement target".to_string(),
                        ));
                    }
                    let op_span = self.advance().span;
                    let span = expr.span.union(op_span);
                    expr = Expr {
                        kind: ExprKind::Update {
                            target: Box::new(expr),
                            increment,
                        },
                        span,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.peek().clone();
        let expr = match token.kind {
            TokenKind::Number(value) => {
                self.advance();
                Expr {
                    kind: ExprKind::Number(value),
                    span: token.span,
                }
            }
            TokenKind::Str(value) => {
                self.advance();
                Expr {
                    kind: ExprKind::Str(value),
                    span: token.span,
                }
            }
            TokenKind::True | TokenKind::False => {
                let value = token.kind == TokenKind::True;
                self.advance();
                Expr {
                    kind: ExprKind::Bool(value),
                    span: token.span,
                }
            }
            TokenKind::Null => {
                self.advance();
                Expr {
                    kind: ExprKind::Null,
                    span: token.span,
                }
            }
            TokenKind::Ident(name) => {
                self.advance();
                Expr {
                    kind: ExprKind::Ident(name),
                    span: token.span,
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "to close grouping")?;
                Expr {
                    kind: inner.kind,
                    span: token.span.union(self.previous_span()),
                }
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&TokenKind::RBracket) {
                    loop {
                        elements.push(self.parse_expr()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RBracket, "to close array literal")?;
                Expr {
                    kind: ExprKind::Array(elements),
                    span: token.span.union(self.previous_span()),
                }
            }
            other => {
                return Err(self.error_here(format!(
                    "expected expression, found {}",
                    other.describe()
                )))
            }
        };
        Ok(expr)
    }
}
