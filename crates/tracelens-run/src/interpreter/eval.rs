//! Statement execution and expression evaluation.

use std::rc::Rc;
use std::time::{Duration, Instant};

use serde_json::Value as Json;
use tracelens_core::{EventKind, Payload};
use tracelens_syntax::{AssignOp, BinaryOp, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};

use super::env::Scopes;
use super::error::RuntimeError;
use super::value::{FunctionDef, Value};
use crate::recorder::TraceRecorder;

/// How often the operation counter triggers a wall-clock check. Loop
/// iterations check the deadline directly on top of this.
const DEADLINE_CHECK_INTERVAL: u64 = 64;

/// Resource bounds for one execution.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ExecLimits {
    pub timeout_ms: u64,
    pub max_ops: u64,
    pub max_call_depth: usize,
}

/// Non-error control flow out of a statement.
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub(crate) struct Interpreter<'r> {
    scopes: Scopes,
    recorder: &'r mut TraceRecorder,
    deadline: Instant,
    timeout_ms: u64,
    max_ops: u64,
    ops: u64,
    call_depth: usize,
    max_call_depth: usize,
}

impl<'r> Interpreter<'r> {
    pub fn new(recorder: &'r mut TraceRecorder, limits: ExecLimits) -> Self {
        Interpreter {
            scopes: Scopes::new(),
            recorder,
            deadline: Instant::now() + Duration::from_millis(limits.timeout_ms),
            timeout_ms: limits.timeout_ms,
            max_ops: limits.max_ops,
            ops: 0,
            call_depth: 0,
            max_call_depth: limits.max_call_depth,
        }
    }

    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        for stmt in &program.body {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                // A top-level return ends the program.
                Flow::Return(_) => break,
                Flow::Break | Flow::Continue => {
                    return Err(RuntimeError::type_error(
                        "'break' or 'continue' outside of a loop",
                    ))
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Resource bounds
    // -----------------------------------------------------------------------

    fn tick(&mut self) -> Result<(), RuntimeError> {
        self.ops += 1;
        if self.ops > self.max_ops {
            return Err(RuntimeError::OpBudgetExhausted {
                limit: self.max_ops,
            });
        }
        if self.ops % DEADLINE_CHECK_INTERVAL == 0 {
            self.check_deadline()?;
        }
        Ok(())
    }

    fn check_deadline(&self) -> Result<(), RuntimeError> {
        if Instant::now() >= self.deadline {
            Err(RuntimeError::TimedOut {
                timeout_ms: self.timeout_ms,
            })
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        self.tick()?;
        match &stmt.kind {
            StmtKind::Decl {
                decl_kind,
                declarators,
            } => {
                let constant = decl_kind.keyword() == "const";
                for declarator in declarators {
                    let value = match &declarator.init {
                        Some(init) => self.eval_expr(init)?,
                        None => Value::Null,
                    };
                    self.scopes.declare(&declarator.name, value, constant);
                }
                Ok(Flow::Normal)
            }
            StmtKind::Assign { target, op, value } => {
                self.exec_assign(target, *op, value)?;
                Ok(Flow::Normal)
            }
            StmtKind::Expr(expr) => {
                self.eval_expr(expr)?;
                Ok(Flow::Normal)
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(cond)?.truthy() {
                    self.exec_stmt(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            StmtKind::While { cond, body } => {
                loop {
                    self.check_deadline()?;
                    self.tick()?;
                    if !self.eval_expr(cond)?.truthy() {
                        break;
                    }
                    match self.exec_stmt(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                // The init declaration lives in its own scope around the loop.
                self.scopes.push();
                let result = self.exec_for(init, cond, update, body);
                self.scopes.pop();
                result
            }
            StmtKind::Block(body) => {
                self.scopes.push();
                let result = self.exec_stmts(body);
                self.scopes.pop();
                result
            }
            StmtKind::FunctionDecl { name, params, body } => {
                let def = FunctionDef {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                };
                self.scopes
                    .declare(name, Value::Function(Rc::new(def)), false);
                Ok(Flow::Normal)
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
        }
    }

    fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            let flow = self.exec_stmt(stmt)?;
            if !matches!(flow, Flow::Normal) {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_for(
        &mut self,
        init: &Option<Box<Stmt>>,
        cond: &Option<Expr>,
        update: &Option<Box<Stmt>>,
        body: &Stmt,
    ) -> Result<Flow, RuntimeError> {
        if let Some(init) = init {
            self.exec_stmt(init)?;
        }
        loop {
            self.check_deadline()?;
            self.tick()?;
            if let Some(cond) = cond {
                if !self.eval_expr(cond)?.truthy() {
                    break;
                }
            }
            match self.exec_stmt(body)? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => break,
                flow @ Flow::Return(_) => return Ok(flow),
            }
            if let Some(update) = update {
                self.exec_stmt(update)?;
            }
        }
        Ok(Flow::Normal)
    }

    // -----------------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------------

    fn exec_assign(
        &mut self,
        target: &Expr,
        op: AssignOp,
        value: &Expr,
    ) -> Result<(), RuntimeError> {
        match &target.kind {
            ExprKind::Ident(name) => {
                let new_value = if op == AssignOp::Assign {
                    self.eval_expr(value)?
                } else {
                    let old = self.scopes.get(name)?;
                    let rhs = self.eval_expr(value)?;
                    apply_compound(&old, op, &rhs)?
                };
                self.scopes.assign(name, new_value)
            }
            ExprKind::Index { object, index } => {
                let array = self.eval_array(object)?;
                let index = self.eval_expr(index)?.as_index()?;
                let new_value = if op == AssignOp::Assign {
                    self.eval_expr(value)?
                } else {
                    let old = read_element(&array, index)?;
                    let rhs = self.eval_expr(value)?;
                    apply_compound(&old, op, &rhs)?
                };
                write_element(&array, index, new_value)
            }
            ExprKind::Array(targets) => {
                if op != AssignOp::Assign {
                    return Err(RuntimeError::type_error(
                        "destructuring assignment must use '='",
                    ));
                }
                // The whole right-hand side is evaluated before any target
                // is written, so reciprocal swaps read pre-swap values.
                let source = match self.eval_expr(value)? {
                    Value::Array(elements) => elements.borrow().clone(),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "cannot destructure {}",
                            other.type_name()
                        )))
                    }
                };
                for (i, target) in targets.iter().enumerate() {
                    let element = source.get(i).cloned().unwrap_or(Value::Null);
                    self.assign_pattern_element(target, element)?;
                }
                Ok(())
            }
            _ => Err(RuntimeError::type_error("invalid assignment target")),
        }
    }

    /// One target of a destructuring pattern: a plain identifier or an
    /// indexed element.
    fn assign_pattern_element(
        &mut self,
        target: &Expr,
        value: Value,
    ) -> Result<(), RuntimeError> {
        match &target.kind {
            ExprKind::Ident(name) => self.scopes.assign(name, value),
            ExprKind::Index { object, index } => {
                let array = self.eval_array(object)?;
                let index = self.eval_expr(index)?.as_index()?;
                write_element(&array, index, value)
            }
            _ => Err(RuntimeError::type_error("invalid assignment target")),
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Ident(name) => self.scopes.get(name),
            ExprKind::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_expr(element)?);
                }
                Ok(Value::array(values))
            }
            ExprKind::Index { object, index } => {
                let array = self.eval_array(object)?;
                let index = self.eval_expr(index)?.as_index()?;
                read_element(&array, index)
            }
            ExprKind::Member { object, property } => {
                if property == "length" {
                    match self.eval_expr(object)? {
                        Value::Array(elements) => {
                            Ok(Value::Number(elements.borrow().len() as f64))
                        }
                        Value::Str(s) => Ok(Value::Number(s.chars().count() as f64)),
                        other => Err(RuntimeError::type_error(format!(
                            "{} has no length",
                            other.type_name()
                        ))),
                    }
                } else {
                    Err(RuntimeError::UnknownProperty {
                        property: property.clone(),
                    })
                }
            }
            ExprKind::Call { callee, args } => self.eval_call(callee, args),
            ExprKind::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs),
            ExprKind::Unary { op, operand } => {
                let operand = self.eval_expr(operand)?;
                match op {
                    UnaryOp::Neg => Ok(Value::Number(-operand.as_number()?)),
                    UnaryOp::Not => Ok(Value::Bool(!operand.truthy())),
                }
            }
            ExprKind::Update { target, increment } => self.eval_update(target, *increment),
        }
    }

    fn eval_array(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match self.eval_expr(expr)? {
            array @ Value::Array(_) => Ok(array),
            other => Err(RuntimeError::type_error(format!(
                "cannot index {}",
                other.type_name()
            ))),
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<Value, RuntimeError> {
        // Short-circuit forms yield the deciding operand itself.
        match op {
            BinaryOp::And => {
                let lhs = self.eval_expr(lhs)?;
                if lhs.truthy() {
                    self.eval_expr(rhs)
                } else {
                    Ok(lhs)
                }
            }
            BinaryOp::Or => {
                let lhs = self.eval_expr(lhs)?;
                if lhs.truthy() {
                    Ok(lhs)
                } else {
                    self.eval_expr(rhs)
                }
            }
            _ => {
                let lhs = self.eval_expr(lhs)?;
                let rhs = self.eval_expr(rhs)?;
                apply_binary(op, &lhs, &rhs)
            }
        }
    }

    fn eval_update(&mut self, target: &Expr, increment: bool) -> Result<Value, RuntimeError> {
        let delta = if increment { 1.0 } else { -1.0 };
        match &target.kind {
            ExprKind::Ident(name) => {
                let old = self.scopes.get(name)?.as_number()?;
                self.scopes.assign(name, Value::Number(old + delta))?;
                Ok(Value::Number(old))
            }
            ExprKind::Index { object, index } => {
                let array = self.eval_array(object)?;
                let index = self.eval_expr(index)?.as_index()?;
                let old = read_element(&array, index)?.as_number()?;
                write_element(&array, index, Value::Number(old + delta))?;
                Ok(Value::Number(old))
            }
            _ => Err(RuntimeError::type_error(
                "invalid increment/decrement target",
            )),
        }
    }

    // -----------------------------------------------------------------------
    // Calls: trace runtime, host builtins, user functions
    // -----------------------------------------------------------------------

    fn eval_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value, RuntimeError> {
        if let ExprKind::Member { object, property } = &callee.kind {
            // Sandbox names take precedence over any user binding.
            return match object.as_ident() {
                Some("__trace__") => self.call_trace(property, args),
                Some("Math") => self.call_math(property, args),
                _ => {
                    let receiver = self.eval_expr(object)?;
                    self.call_method(receiver, property, args)
                }
            };
        }
        match &callee.kind {
            ExprKind::Ident(name) => match self.scopes.get(name)? {
                Value::Function(def) => self.call_function(def, args),
                _ => Err(RuntimeError::NotAFunction { name: name.clone() }),
            },
            _ => Err(RuntimeError::type_error("expression is not callable")),
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg)?);
        }
        Ok(values)
    }

    fn call_trace(&mut self, method: &str, args: &[Expr]) -> Result<Value, RuntimeError> {
        let values = self.eval_args(args)?;
        let arity = |expected: usize| -> Result<(), RuntimeError> {
            if values.len() == expected {
                Ok(())
            } else {
                Err(RuntimeError::type_error(format!(
                    "__trace__.{method} expects {expected} arguments, got {}",
                    values.len()
                )))
            }
        };
        match method {
            "declare" | "assign" => {
                arity(2)?;
                let name = trace_name(&values[0], method)?;
                let value = values[1].to_json()?;
                if method == "declare" {
                    self.recorder.declare(&name, value);
                } else {
                    self.recorder.assign(&name, value);
                }
            }
            "arrayWrite" => {
                arity(3)?;
                let name = trace_name(&values[0], method)?;
                let index = values[1].to_json()?;
                let value = values[2].to_json()?;
                self.recorder.array_write(&name, index, value);
            }
            "compare" => {
                arity(2)?;
                self.recorder
                    .compare(values[0].to_json()?, values[1].to_json()?);
            }
            "swap" => {
                arity(3)?;
                let name = trace_name(&values[0], method)?;
                self.recorder
                    .swap(&name, values[1].to_json()?, values[2].to_json()?);
            }
            "emit" => {
                arity(2)?;
                let kind = trace_name(&values[0], method)?;
                let payload = match values[1].to_json()? {
                    Json::Object(map) => map.into_iter().collect::<Payload>(),
                    other => {
                        let mut payload = Payload::new();
                        payload.insert("value".to_string(), other);
                        payload
                    }
                };
                self.recorder.emit(EventKind::from_name(&kind), payload);
            }
            other => {
                return Err(RuntimeError::UnknownTraceMethod {
                    method: other.to_string(),
                })
            }
        }
        Ok(Value::Null)
    }

    fn call_math(&mut self, method: &str, args: &[Expr]) -> Result<Value, RuntimeError> {
        let values = self.eval_args(args)?;
        let mut numbers = Vec::with_capacity(values.len());
        for value in &values {
            numbers.push(value.as_number()?);
        }
        let result = match (method, numbers.as_slice()) {
            ("floor", [n]) => n.floor(),
            ("abs", [n]) => n.abs(),
            ("min", rest) if !rest.is_empty() => rest.iter().copied().fold(f64::MAX, f64::min),
            ("max", rest) if !rest.is_empty() => rest.iter().copied().fold(f64::MIN, f64::max),
            ("floor" | "abs" | "min" | "max", _) => {
                return Err(RuntimeError::type_error(format!(
                    "wrong number of arguments to Math.{method}"
                )))
            }
            _ => {
                return Err(RuntimeError::UnknownProperty {
                    property: format!("Math.{method}"),
                })
            }
        };
        Ok(Value::Number(result))
    }

    fn call_method(
        &mut self,
        receiver: Value,
        method: &str,
        args: &[Expr],
    ) -> Result<Value, RuntimeError> {
        // Arguments are evaluated before the receiver is borrowed, so
        // `a.push(a.pop())` cannot alias a live borrow.
        let values = self.eval_args(args)?;
        match (&receiver, method) {
            (Value::Array(elements), "push") => {
                let mut elements = elements.borrow_mut();
                elements.extend(values);
                Ok(Value::Number(elements.len() as f64))
            }
            (Value::Array(elements), "pop") => {
                Ok(elements.borrow_mut().pop().unwrap_or(Value::Null))
            }
            _ => Err(RuntimeError::UnknownProperty {
                property: method.to_string(),
            }),
        }
    }

    fn call_function(
        &mut self,
        def: Rc<FunctionDef>,
        args: &[Expr],
    ) -> Result<Value, RuntimeError> {
        self.tick()?;
        if self.call_depth >= self.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                limit: self.max_call_depth,
            });
        }
        let values = self.eval_args(args)?;

        self.call_depth += 1;
        self.scopes.push_frame();
        for (i, param) in def.params.iter().enumerate() {
            let value = values.get(i).cloned().unwrap_or(Value::Null);
            self.scopes.declare(param, value, false);
        }
        let result = self.exec_stmts(&def.body);
        self.scopes.pop_frame();
        self.call_depth -= 1;

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Null),
            Flow::Break | Flow::Continue => Err(RuntimeError::type_error(
                "'break' or 'continue' outside of a loop",
            )),
        }
    }
}

fn trace_name(value: &Value, method: &str) -> Result<String, RuntimeError> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        other => Err(RuntimeError::type_error(format!(
            "__trace__.{method} expects a string name, found {}",
            other.type_name()
        ))),
    }
}

fn read_element(array: &Value, index: i64) -> Result<Value, RuntimeError> {
    let Value::Array(elements) = array else {
        return Err(RuntimeError::type_error("cannot index a non-array"));
    };
    let elements = elements.borrow();
    if index < 0 || index as usize >= elements.len() {
        return Err(RuntimeError::IndexOutOfBounds {
            index,
            len: elements.len(),
        });
    }
    Ok(elements[index as usize].clone())
}

/// Writes in place; writing one past the end extends the array.
fn write_element(array: &Value, index: i64, value: Value) -> Result<(), RuntimeError> {
    let Value::Array(elements) = array else {
        return Err(RuntimeError::type_error("cannot index a non-array"));
    };
    let mut elements = elements.borrow_mut();
    let len = elements.len();
    if index < 0 || index as usize > len {
        return Err(RuntimeError::IndexOutOfBounds { index, len });
    }
    if index as usize == len {
        elements.push(value);
    } else {
        elements[index as usize] = value;
    }
    Ok(())
}

fn apply_compound(old: &Value, op: AssignOp, rhs: &Value) -> Result<Value, RuntimeError> {
    let binary = match op {
        AssignOp::Add => BinaryOp::Add,
        AssignOp::Sub => BinaryOp::Sub,
        AssignOp::Mul => BinaryOp::Mul,
        AssignOp::Div => BinaryOp::Div,
        AssignOp::Assign => unreachable!("plain assignment is not compound"),
    };
    apply_binary(binary, old, rhs)
}

fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add => match (lhs, rhs) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::Str(format!(
                "{}{}",
                lhs.to_display_string(),
                rhs.to_display_string()
            ))),
            _ => Ok(Value::Number(lhs.as_number()? + rhs.as_number()?)),
        },
        BinaryOp::Sub => Ok(Value::Number(lhs.as_number()? - rhs.as_number()?)),
        BinaryOp::Mul => Ok(Value::Number(lhs.as_number()? * rhs.as_number()?)),
        // Division by zero follows IEEE float semantics, as the input
        // language expects: no trap, the result is an infinity.
        BinaryOp::Div => Ok(Value::Number(lhs.as_number()? / rhs.as_number()?)),
        BinaryOp::Rem => Ok(Value::Number(lhs.as_number()? % rhs.as_number()?)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering_holds = match (lhs, rhs) {
                (Value::Str(a), Value::Str(b)) => compare_with(op, a.cmp(b)),
                _ => {
                    let (a, b) = (lhs.as_number()?, rhs.as_number()?);
                    match a.partial_cmp(&b) {
                        Some(ordering) => compare_with(op, ordering),
                        None => false,
                    }
                }
            };
            Ok(Value::Bool(ordering_holds))
        }
        BinaryOp::Eq | BinaryOp::StrictEq => Ok(Value::Bool(lhs.strict_eq(rhs))),
        BinaryOp::NotEq | BinaryOp::StrictNotEq => Ok(Value::Bool(!lhs.strict_eq(rhs))),
        BinaryOp::And | BinaryOp::Or => {
            unreachable!("short-circuit operators are handled in eval_binary")
        }
    }
}

fn compare_with(op: BinaryOp, ordering: std::cmp::Ordering) -> bool {
    match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => unreachable!("not an ordering operator"),
    }
}
