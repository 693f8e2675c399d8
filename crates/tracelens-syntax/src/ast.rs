//! AST for the input language.
//!
//! Statements and expressions carry byte spans over the original source.
//! A statement span includes its trailing semicolon when one was written,
//! so "splice after this statement" means "insert at `span.end`".

use serde::Serialize;

use crate::token::Span;

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeclKind {
    Let,
    Const,
    Var,
}

impl DeclKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            DeclKind::Let => "let",
            DeclKind::Const => "const",
            DeclKind::Var => "var",
        }
    }
}

/// One `name = init` element of a declaration's comma list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    /// Loose equality (`==`).
    Eq,
    /// Loose inequality (`!=`).
    NotEq,
    /// Strict equality (`===`).
    StrictEq,
    /// Strict inequality (`!==`).
    StrictNotEq,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StmtKind {
    Decl {
        decl_kind: DeclKind,
        declarators: Vec<Declarator>,
    },
    /// `target op value`, where the target may be an identifier, an indexed
    /// element, or an array pattern of such targets (destructuring).
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
    },
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Box<Stmt>>,
        body: Box<Stmt>,
    },
    Block(Vec<Stmt>),
    FunctionDecl {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Ident(String),
    Array(Vec<Expr>),
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: String,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Postfix `target++` / `target--`.
    Update {
        target: Box<Expr>,
        increment: bool,
    },
}

impl Expr {
    /// The identifier name, when this expression is a plain identifier.
    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_ident_only_matches_plain_identifiers() {
        let ident = Expr {
            kind: ExprKind::Ident("a".to_string()),
            span: Span::new(0, 1),
        };
        assert_eq!(ident.as_ident(), Some("a"));

        let number = Expr {
            kind: ExprKind::Number(1.0),
            span: Span::new(0, 1),
        };
        assert_eq!(number.as_ident(), None);
    }

    #[test]
    fn ast_nodes_serialize_for_debugging_dumps() {
        let expr = Expr {
            kind: ExprKind::Index {
                object: Box::new(Expr {
                    kind: ExprKind::Ident("a".to_string()),
                    span: Span::new(0, 1),
                }),
                index: Box::new(Expr {
                    kind: ExprKind::Number(0.0),
                    span: Span::new(2, 3),
                }),
            },
            span: Span::new(0, 4),
        };
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(json["span"]["start"], 0);
        assert_eq!(json["kind"]["Index"]["object"]["kind"]["Ident"], "a");
    }
}
