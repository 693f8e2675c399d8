//! Collection phase: walk the AST and gather probe insertions.
//!
//! Rules are mutually exclusive per anchor statement, applied with a fixed
//! precedence: swap, then indexed write, then declaration. All probes for
//! one statement are merged into a single insertion so anchors stay unique.

use tracelens_syntax::{AssignOp, Expr, ExprKind, Program, Stmt, StmtKind};

/// One pending splice: probe text inserted at `anchor_end` (the byte offset
/// just past the anchor statement, trailing semicolon included).
pub(crate) struct Insertion {
    pub anchor_end: usize,
    pub text: String,
}

pub(crate) fn collect(program: &Program, source: &str) -> Vec<Insertion> {
    let mut insertions = Vec::new();
    collect_stmts(&program.body, source, &mut insertions);
    insertions
}

fn collect_stmts(stmts: &[Stmt], source: &str, out: &mut Vec<Insertion>) {
    for stmt in stmts {
        collect_stmt(stmt, source, out);
    }
}

fn collect_stmt(stmt: &Stmt, source: &str, out: &mut Vec<Insertion>) {
    match &stmt.kind {
        StmtKind::Assign { target, op, value } => {
            if let Some(text) = swap_probe(target, *op, value, source) {
                out.push(Insertion {
                    anchor_end: stmt.span.end,
                    text,
                });
            } else if let Some(text) = indexed_write_probe(target, *op, source) {
                out.push(Insertion {
                    anchor_end: stmt.span.end,
                    text,
                });
            }
        }
        StmtKind::Decl { declarators, .. } => {
            let mut text = String::new();
            for declarator in declarators {
                if matches!(
                    declarator.init,
                    Some(Expr {
                        kind: ExprKind::Array(_),
                        ..
                    })
                ) {
                    text.push_str(&format!(
                        " __trace__.declare(\"{0}\", {0});",
                        declarator.name
                    ));
                }
            }
            if !text.is_empty() {
                out.push(Insertion {
                    anchor_end: stmt.span.end,
                    text,
                });
            }
        }
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            collect_stmt(then_branch, source, out);
            if let Some(else_branch) = else_branch {
                collect_stmt(else_branch, source, out);
            }
        }
        StmtKind::While { body, .. } => collect_stmt(body, source, out),
        // Loop headers are not anchors; only the body is walked.
        StmtKind::For { body, .. } => collect_stmt(body, source, out),
        StmtKind::Block(body) => collect_stmts(body, source, out),
        StmtKind::FunctionDecl { body, .. } => collect_stmts(body, source, out),
        StmtKind::Expr(_) | StmtKind::Return(_) | StmtKind::Break | StmtKind::Continue => {}
    }
}

/// An indexed access `name[index]`, decomposed for pattern matching.
struct IndexedAccess<'a> {
    name: &'a str,
    index_text: &'a str,
    index: &'a Expr,
}

fn as_indexed_access<'a>(expr: &'a Expr, source: &'a str) -> Option<IndexedAccess<'a>> {
    match &expr.kind {
        ExprKind::Index { object, index } => Some(IndexedAccess {
            name: object.as_ident()?,
            index_text: index.span.text(source).trim(),
            index,
        }),
        _ => None,
    }
}

/// Whether evaluating the expression could change program state. Probe
/// text re-evaluates the index expression, so a side-effecting index must
/// not be instrumented at all: the pass stays additive and the program
/// keeps its original semantics.
fn has_side_effects(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Update { .. } | ExprKind::Call { .. } => true,
        ExprKind::Number(_)
        | ExprKind::Str(_)
        | ExprKind::Bool(_)
        | ExprKind::Null
        | ExprKind::Ident(_) => false,
        ExprKind::Array(elements) => elements.iter().any(has_side_effects),
        ExprKind::Index { object, index } => has_side_effects(object) || has_side_effects(index),
        ExprKind::Member { object, .. } => has_side_effects(object),
        ExprKind::Binary { lhs, rhs, .. } => has_side_effects(lhs) || has_side_effects(rhs),
        ExprKind::Unary { operand, .. } => has_side_effects(operand),
    }
}

/// Recognizes the exact two-element reciprocal swap
/// `[a[i], a[j]] = [a[j], a[i]]`: same collection name in all four accesses
/// and index texts mirrored. Anything looser passes through untouched.
fn swap_probe(target: &Expr, op: AssignOp, value: &Expr, source: &str) -> Option<String> {
    if op != AssignOp::Assign {
        return None;
    }
    let (ExprKind::Array(lhs), ExprKind::Array(rhs)) = (&target.kind, &value.kind) else {
        return None;
    };
    if lhs.len() != 2 || rhs.len() != 2 {
        return None;
    }
    let l0 = as_indexed_access(&lhs[0], source)?;
    let l1 = as_indexed_access(&lhs[1], source)?;
    let r0 = as_indexed_access(&rhs[0], source)?;
    let r1 = as_indexed_access(&rhs[1], source)?;

    let name = l0.name;
    if l1.name != name || r0.name != name || r1.name != name {
        return None;
    }
    if l0.index_text != r1.index_text || l1.index_text != r0.index_text {
        return None;
    }
    // The probe repeats both index expressions; mirrored texts mean the
    // left-hand pair covers all four.
    if has_side_effects(l0.index) || has_side_effects(l1.index) {
        return None;
    }

    let (i, j) = (l0.index_text, l1.index_text);
    Some(format!(
        " __trace__.arrayWrite(\"{name}\", {i}, {name}[{i}]); \
__trace__.arrayWrite(\"{name}\", {j}, {name}[{j}]); \
__trace__.assign(\"{name}\", {name});"
    ))
}

/// Recognizes `name[index] = value` (plain assignment only). The probe reads
/// the element back after the assignment ran, so the recorded value is
/// exactly what was stored.
fn indexed_write_probe(target: &Expr, op: AssignOp, source: &str) -> Option<String> {
    if op != AssignOp::Assign {
        return None;
    }
    let access = as_indexed_access(target, source)?;
    if has_side_effects(access.index) {
        return None;
    }
    let (name, index) = (access.name, access.index_text);
    Some(format!(
        " __trace__.arrayWrite(\"{name}\", {index}, {name}[{index}]);"
    ))
}
