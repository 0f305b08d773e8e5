//! Tree-walking evaluator.
//!
//! Walks the nodes of a [`Program`] against an [`Environment`], handing
//! commands to the [`Dispatcher`]. The first error aborts the rest of the
//! statement, including the remaining statements of an enclosing block.

use crate::ast::{AssignOp, Assignment, Command, Conditional, Expr, If, Node, Program};
use crate::command::Streams;
use crate::dispatch::Dispatcher;
use crate::env::Environment;
use crate::error::ShellError;
use crate::value::{Number, Value};

pub struct Evaluator<'a, 'w> {
    env: &'a mut Environment,
    dispatcher: &'a Dispatcher,
    streams: Streams<'w>,
}

impl<'a, 'w> Evaluator<'a, 'w> {
    pub fn new(env: &'a mut Environment, dispatcher: &'a Dispatcher, streams: Streams<'w>) -> Self {
        Self {
            env,
            dispatcher,
            streams,
        }
    }

    /// Runs every top-level statement in order, stopping at the first error.
    pub fn run(&mut self, program: &Program) -> Result<(), ShellError> {
        for statement in &program.statements {
            self.evaluate(statement)?;
        }
        Ok(())
    }

    /// Evaluates one statement and prints its result, if it has a printable one.
    pub fn evaluate(&mut self, node: &Node) -> Result<(), ShellError> {
        if let Some(value) = self.eval(node)? {
            self.emit(&value)?;
        }
        Ok(())
    }

    /// Value of a statement without printing it. Blocks print their children
    /// as they go and have no value of their own.
    pub fn eval(&mut self, node: &Node) -> Result<Option<Value>, ShellError> {
        match node {
            Node::Assignment(assignment) => {
                self.assign(assignment)?;
                Ok(None)
            }
            Node::If(if_) => self.eval_if(if_),
            Node::Command(command) => self.eval_command(command),
            Node::Block(block) => {
                for statement in &block.statements {
                    self.evaluate(statement)?;
                }
                Ok(None)
            }
            Node::Expr(expr) => Ok(Some(self.eval_expr(expr))),
        }
    }

    pub fn eval_expr(&self, expr: &Expr) -> Value {
        match expr {
            Expr::Literal(value) => value.clone(),
            Expr::EnvVar(var) => self.env.get(&var.name),
        }
    }

    pub fn eval_conditional(&self, conditional: &Conditional) -> bool {
        match conditional {
            Conditional::IsEqualTo { x, y } => self.eval_expr(x) == self.eval_expr(y),
        }
    }

    fn eval_if(&mut self, if_: &If) -> Result<Option<Value>, ShellError> {
        if self.eval_conditional(&if_.conditional) {
            self.eval(&if_.statement)
        } else if let Some(else_) = &if_.else_ {
            self.eval(else_)
        } else {
            Ok(None)
        }
    }

    fn eval_command(&mut self, command: &Command) -> Result<Option<Value>, ShellError> {
        let options: Vec<String> = command
            .options
            .iter()
            .map(|option| self.eval_expr(option).to_string())
            .collect();
        let result =
            self.dispatcher
                .dispatch(&command.name, &options, &mut self.streams, self.env)?;
        Ok(result.map(Value::Result))
    }

    fn assign(&mut self, assignment: &Assignment) -> Result<(), ShellError> {
        let rhs = self.eval_expr(&assignment.value);
        let value = match assignment.op {
            AssignOp::Set => rhs,
            op => {
                let current = self.env.get(&assignment.name);
                combine(op, &assignment.name, current, rhs)?
            }
        };
        self.env.set(&assignment.name, value)
    }

    fn emit(&mut self, value: &Value) -> Result<(), ShellError> {
        let text = value.to_string();
        if !text.is_empty() {
            self.streams.stdout.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                self.streams.stdout.write_all(b"\n")?;
            }
            self.streams.stdout.flush()?;
        }
        if let Value::Result(result) = value {
            if !result.stderr.is_empty() {
                self.streams.stderr.write_all(&result.stderr)?;
                self.streams.stderr.flush()?;
            }
        }
        Ok(())
    }
}

/// Compound assignment: `current op rhs`.
///
/// Numbers (and strings holding numbers) combine arithmetically, an unset
/// variable counting as zero. `+=` concatenates anything else.
fn combine(op: AssignOp, name: &str, current: Value, rhs: Value) -> Result<Value, ShellError> {
    let unset = matches!(&current, Value::Str(s) if s.is_empty());
    let lhs = if unset { Some(Number::Int(0)) } else { current.as_number() };
    if let (Some(a), Some(b)) = (lhs, rhs.as_number()) {
        return arithmetic(op, a, b).map(Value::from).ok_or_else(|| {
            ShellError::InvalidAssignment(format!(
                "cannot compute {name} {} {rhs}: division by zero or overflow",
                op.symbol()
            ))
        });
    }
    if op == AssignOp::Add {
        return Ok(Value::Str(format!("{current}{rhs}")));
    }
    Err(ShellError::InvalidAssignment(format!(
        "cannot apply {} to non-numeric values in '{name}'",
        op.symbol()
    )))
}

fn arithmetic(op: AssignOp, a: Number, b: Number) -> Option<Number> {
    if let (Number::Int(x), Number::Int(y)) = (a, b) {
        return match op {
            AssignOp::Set => Some(b),
            AssignOp::Add => x.checked_add(y).map(Number::Int),
            AssignOp::Sub => x.checked_sub(y).map(Number::Int),
            AssignOp::Mul => x.checked_mul(y).map(Number::Int),
            AssignOp::Div => match x.checked_rem(y)? {
                0 => x.checked_div(y).map(Number::Int),
                _ => Some(Number::Float(x as f64 / y as f64)),
            },
        };
    }
    let (x, y) = (a.as_f64(), b.as_f64());
    let result = match op {
        AssignOp::Set => y,
        AssignOp::Add => x + y,
        AssignOp::Sub => x - y,
        AssignOp::Mul => x * y,
        AssignOp::Div if y == 0.0 => return None,
        AssignOp::Div => x / y,
    };
    Some(Number::Float(result))
}
