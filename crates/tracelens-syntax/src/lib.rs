//! Front-end for the dynamic, array/loop-oriented input language.
//!
//! Provides the lexer, AST, and parser the instrumentation transform and
//! the sandboxed interpreter share. Every statement and expression carries
//! a byte [`Span`] over the original source text -- the transform splices
//! probe calls by span, so spans must be exact.
//!
//! Parsing is a pure function of the input text: a fresh parse context is
//! built per call and no state is carried between calls.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{
    AssignOp, BinaryOp, DeclKind, Declarator, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp,
};
pub use lexer::tokenize;
pub use parser::{parse_program, SyntaxError};
pub use token::{Span, Token, TokenKind};
