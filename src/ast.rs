//! Typed syntax tree produced by the parser and walked by the evaluator.
//!
//! Nodes are plain data; evaluation lives in [`crate::eval`]. Once built a tree
//! is never mutated.

use crate::value::Value;

/// Either a literal value or a variable reference that is resolved at
/// evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    EnvVar(EnvVar),
}

/// `$NAME`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" => AssignOp::Set,
            "+=" => AssignOp::Add,
            "-=" => AssignOp::Sub,
            "*=" => AssignOp::Mul,
            "/=" => AssignOp::Div,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Set => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
        }
    }
}

/// `name = value` and the compound forms `name += value` etc.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub op: AssignOp,
    pub value: Expr,
}

/// Conditions evaluate to a boolean.
#[derive(Debug, Clone, PartialEq)]
pub enum Conditional {
    IsEqualTo { x: Expr, y: Expr },
}

/// `if (conditional) { ... } else { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub conditional: Conditional,
    pub statement: Box<Node>,
    pub else_: Option<Box<Node>>,
}

/// A command invocation: name and the options passed to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub options: Vec<Expr>,
}

/// Statements run in order; the block itself has no value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatementBlock {
    pub statements: Vec<Node>,
}

/// Any statement the evaluator can run.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Assignment(Assignment),
    If(If),
    Command(Command),
    Block(StatementBlock),
    /// A bare value used as a statement; its value is printed.
    Expr(Expr),
}

impl Node {
    pub fn command(name: impl Into<String>, options: Vec<Expr>) -> Self {
        Node::Command(Command {
            name: name.into(),
            options,
        })
    }
}

/// All top-level statements of one parsed line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Node>,
}
