//! Table-driven parser.
//!
//! One shift/reduce driver serves two front ends: [`Parser::parse`] builds the
//! typed [`Program`] the evaluator runs, [`Parser::parse_tree`] returns the raw
//! [`Tree`] that grammar-conformance tests compare against.

use crate::ast::{AssignOp, Assignment, Command, Conditional, EnvVar, Expr, If, Node, Program, StatementBlock};
use crate::error::{GrammarError, ParseError};
use crate::grammar::{DEFAULT_GRAMMAR, END, Grammar, Shape};
use crate::lexer::{self, LexKind, Lexeme};
use crate::table::{Action, ParseTable};
use crate::value::Value;
use std::fmt::Write as _;

/// A grammar together with its parse table. Build once, parse many times.
#[derive(Debug)]
pub struct Parser {
    grammar: Grammar,
    table: ParseTable,
}

impl Parser {
    /// Parser for the built-in grammar.
    pub fn new() -> Result<Self, GrammarError> {
        Self::from_grammar(DEFAULT_GRAMMAR)
    }

    pub fn from_grammar(definition: &str) -> Result<Self, GrammarError> {
        let grammar = Grammar::parse(definition)?;
        let table = ParseTable::build(&grammar)?;
        Ok(Self { grammar, table })
    }

    /// Parses one complete statement line into typed nodes.
    pub fn parse(&self, text: &str) -> Result<Program, ParseError> {
        match self.drive(text, &mut AstBuilder)? {
            Fragment::Program(program) => Ok(program),
            _ => Err(malformed("start")),
        }
    }

    /// Parses one complete statement line into an untransformed tree.
    pub fn parse_tree(&self, text: &str) -> Result<Tree, ParseError> {
        match self.drive(text, &mut TreeBuilder)? {
            ParseNode::Tree(tree) => Ok(tree),
            ParseNode::Token { .. } => Err(malformed("start")),
        }
    }

    fn drive<R: Reducer>(&self, text: &str, reducer: &mut R) -> Result<R::Output, ParseError> {
        let lexemes = lexer::split_into_tokens(text)?;
        let mut input = lexemes.into_iter().peekable();
        let mut stack: Vec<(usize, Slot<R::Output>)> = vec![(0, Slot::Dropped)];

        loop {
            let state = stack.last().map_or(0, |(s, _)| *s);
            let terminal = match input.peek() {
                Some(lexeme) => self
                    .grammar
                    .terminal_for(lexeme)
                    .ok_or_else(|| self.unexpected(state, Some(lexeme)))?,
                None => END,
            };
            let action = self
                .table
                .action(state, terminal)
                .ok_or_else(|| self.unexpected(state, input.peek()))?;

            match action {
                Action::Shift(next) => {
                    let Some(lexeme) = input.next() else {
                        return Err(self.unexpected(state, None));
                    };
                    let def = &self.grammar.terminals[terminal];
                    let slot = if def.is_anonymous() {
                        Slot::Dropped
                    } else {
                        Slot::Value(reducer.token(lexeme))
                    };
                    stack.push((next, slot));
                }
                Action::Reduce(index) => {
                    let production = &self.grammar.productions[index];
                    let rule = &self.grammar.rules[production.rule];
                    let popped = stack.split_off(stack.len() - production.symbols.len());
                    let mut children = Vec::with_capacity(popped.len());
                    for (_, slot) in popped {
                        match slot {
                            Slot::Value(v) => children.push(v),
                            Slot::Spliced(vs) => children.extend(vs),
                            Slot::Dropped => {}
                        }
                    }
                    let slot = match rule.shape {
                        Shape::Splice => Slot::Spliced(children),
                        Shape::Inline if children.len() == 1 => {
                            Slot::Value(children.pop().ok_or_else(|| malformed(&rule.name))?)
                        }
                        _ => Slot::Value(reducer.rule(&rule.name, children)?),
                    };
                    let top = stack.last().map_or(0, |(s, _)| *s);
                    let next = self
                        .table
                        .goto(top, production.rule)
                        .ok_or_else(|| malformed(&rule.name))?;
                    stack.push((next, slot));
                }
                Action::Accept => {
                    return match stack.pop() {
                        Some((_, Slot::Value(v))) => Ok(v),
                        _ => Err(malformed("start")),
                    };
                }
            }
        }
    }

    fn unexpected(&self, state: usize, found: Option<&Lexeme>) -> ParseError {
        let expected = self
            .table
            .expected(state)
            .into_iter()
            .map(|t| self.grammar.terminals[t].to_string())
            .collect();
        match found {
            Some(lexeme) => ParseError::UnexpectedToken {
                found: lexeme.text.clone(),
                offset: lexeme.offset,
                expected,
            },
            None => ParseError::UnexpectedEnd { expected },
        }
    }
}

fn malformed(rule: &str) -> ParseError {
    ParseError::Malformed {
        rule: rule.to_string(),
    }
}

enum Slot<T> {
    Value(T),
    Spliced(Vec<T>),
    Dropped,
}

/// Semantic actions run by the driver. Only named terminals and rules that
/// survive inlining and splicing reach the reducer.
trait Reducer {
    type Output;

    fn token(&mut self, lexeme: Lexeme) -> Self::Output;

    fn rule(&mut self, name: &str, children: Vec<Self::Output>) -> Result<Self::Output, ParseError>;
}

/// Raw parse tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNode {
    Tree(Tree),
    Token { terminal: &'static str, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub rule: String,
    pub children: Vec<ParseNode>,
}

impl Tree {
    /// Indented rendering: one rule per line, children two spaces deeper, and
    /// a lone token child printed after a tab on its rule's line.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(0, &mut out);
        out
    }

    fn write_pretty(&self, level: usize, out: &mut String) {
        let indent = "  ".repeat(level);
        out.push_str(&indent);
        out.push_str(&self.rule);
        if let [ParseNode::Token { text, .. }] = self.children.as_slice() {
            let _ = writeln!(out, "\t{text}");
            return;
        }
        out.push('\n');
        for child in &self.children {
            match child {
                ParseNode::Tree(tree) => tree.write_pretty(level + 1, out),
                ParseNode::Token { text, .. } => {
                    let _ = writeln!(out, "{indent}  {text}");
                }
            }
        }
    }
}

struct TreeBuilder;

impl Reducer for TreeBuilder {
    type Output = ParseNode;

    fn token(&mut self, lexeme: Lexeme) -> ParseNode {
        ParseNode::Token {
            terminal: lexeme.kind.terminal_name(),
            text: lexeme.text,
        }
    }

    fn rule(&mut self, name: &str, children: Vec<ParseNode>) -> Result<ParseNode, ParseError> {
        Ok(ParseNode::Tree(Tree {
            rule: name.to_string(),
            children,
        }))
    }
}

enum Fragment {
    Lexeme(Lexeme),
    Expr(Expr),
    Cond(Conditional),
    Node(Node),
    Program(Program),
}

impl Fragment {
    fn into_expr(self, rule: &str) -> Result<Expr, ParseError> {
        match self {
            Fragment::Expr(expr) => Ok(expr),
            Fragment::Lexeme(lexeme) if lexeme.kind == LexKind::Word => {
                Ok(Expr::Literal(Value::Str(lexeme.text)))
            }
            _ => Err(malformed(rule)),
        }
    }

    fn into_node(self, rule: &str) -> Result<Node, ParseError> {
        match self {
            Fragment::Node(node) => Ok(node),
            Fragment::Expr(expr) => Ok(Node::Expr(expr)),
            _ => Err(malformed(rule)),
        }
    }

    fn into_lexeme(self, rule: &str) -> Result<Lexeme, ParseError> {
        match self {
            Fragment::Lexeme(lexeme) => Ok(lexeme),
            _ => Err(malformed(rule)),
        }
    }
}

/// Turns each reduction straight into a typed node.
struct AstBuilder;

impl AstBuilder {
    fn statements(rule: &str, children: Vec<Fragment>) -> Result<Vec<Node>, ParseError> {
        children.into_iter().map(|c| c.into_node(rule)).collect()
    }

    fn literal(rule: &str, children: Vec<Fragment>) -> Result<Lexeme, ParseError> {
        let mut children = children.into_iter();
        match (children.next(), children.next()) {
            (Some(child), None) => child.into_lexeme(rule),
            _ => Err(malformed(rule)),
        }
    }
}

impl Reducer for AstBuilder {
    type Output = Fragment;

    fn token(&mut self, lexeme: Lexeme) -> Fragment {
        Fragment::Lexeme(lexeme)
    }

    fn rule(&mut self, name: &str, children: Vec<Fragment>) -> Result<Fragment, ParseError> {
        let fragment = match name {
            "start" => Fragment::Program(Program {
                statements: Self::statements(name, children)?,
            }),
            "block" => Fragment::Node(Node::Block(StatementBlock {
                statements: Self::statements(name, children)?,
            })),
            "assignment" => {
                let [target, op, value]: [Fragment; 3] =
                    children.try_into().map_err(|_| malformed(name))?;
                let op = op.into_lexeme(name)?;
                Fragment::Node(Node::Assignment(Assignment {
                    name: target.into_lexeme(name)?.text,
                    op: AssignOp::from_symbol(&op.text).ok_or_else(|| malformed(name))?,
                    value: value.into_expr(name)?,
                }))
            }
            "command" => {
                let mut children = children.into_iter();
                let command = children.next().ok_or_else(|| malformed(name))?;
                Fragment::Node(Node::Command(Command {
                    name: command.into_lexeme(name)?.text,
                    options: children
                        .map(|c| c.into_expr(name))
                        .collect::<Result<_, _>>()?,
                }))
            }
            "if_" => {
                let mut children = children.into_iter();
                let conditional = match children.next() {
                    Some(Fragment::Cond(cond)) => cond,
                    _ => return Err(malformed(name)),
                };
                let statement = children.next().ok_or_else(|| malformed(name))?;
                let else_ = children.next().map(|c| c.into_node(name)).transpose()?;
                Fragment::Node(Node::If(If {
                    conditional,
                    statement: Box::new(statement.into_node(name)?),
                    else_: else_.map(Box::new),
                }))
            }
            "cond_eq" => {
                let [x, y]: [Fragment; 2] = children.try_into().map_err(|_| malformed(name))?;
                Fragment::Cond(Conditional::IsEqualTo {
                    x: x.into_expr(name)?,
                    y: y.into_expr(name)?,
                })
            }
            "string" => {
                let lexeme = Self::literal(name, children)?;
                Fragment::Expr(Expr::Literal(Value::Str(lexer::unquote(&lexeme.text))))
            }
            "int" => {
                let lexeme = Self::literal(name, children)?;
                let n = lexeme.text.parse().map_err(|_| malformed(name))?;
                Fragment::Expr(Expr::Literal(Value::Int(n)))
            }
            "float" => {
                let lexeme = Self::literal(name, children)?;
                let f = lexeme.text.parse().map_err(|_| malformed(name))?;
                Fragment::Expr(Expr::Literal(Value::Float(f)))
            }
            "true" => Fragment::Expr(Expr::Literal(Value::Bool(true))),
            "false" => Fragment::Expr(Expr::Literal(Value::Bool(false))),
            "null" => Fragment::Expr(Expr::Literal(Value::Null)),
            "env_var" => {
                let lexeme = Self::literal(name, children)?;
                Fragment::Expr(Expr::EnvVar(EnvVar {
                    name: lexeme.text.trim_start_matches('$').to_string(),
                }))
            }
            _ => return Err(malformed(name)),
        };
        Ok(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> Parser {
        Parser::new().unwrap()
    }

    fn lit(s: &str) -> Expr {
        Expr::Literal(Value::Str(s.to_string()))
    }

    fn single(text: &str) -> Node {
        let mut program = parser().parse(text).unwrap();
        assert_eq!(program.statements.len(), 1, "{text}");
        program.statements.remove(0)
    }

    #[test]
    fn command_with_mixed_options() {
        assert_eq!(
            single("print \"hi\" -n $USER 3"),
            Node::command(
                "print",
                vec![
                    lit("hi"),
                    lit("-n"),
                    Expr::EnvVar(EnvVar {
                        name: "USER".to_string()
                    }),
                    Expr::Literal(Value::Int(3)),
                ]
            )
        );
    }

    #[test]
    fn bare_command() {
        assert_eq!(single("cwd"), Node::command("cwd", vec![]));
    }

    #[test]
    fn assignment_and_compound_assignment() {
        assert_eq!(
            single("x = 10"),
            Node::Assignment(Assignment {
                name: "x".to_string(),
                op: AssignOp::Set,
                value: Expr::Literal(Value::Int(10)),
            })
        );
        let Node::Assignment(assignment) = single("x /= 2.5") else {
            panic!("expected assignment");
        };
        assert_eq!(assignment.op, AssignOp::Div);
        assert_eq!(assignment.value, Expr::Literal(Value::Float(2.5)));
    }

    #[test]
    fn if_else_with_blocks() {
        let node = single("if (1 == 2) { print \"yes\" } else { print \"no\"; cwd }");
        let Node::If(if_) = node else {
            panic!("expected if");
        };
        assert_eq!(
            if_.conditional,
            Conditional::IsEqualTo {
                x: Expr::Literal(Value::Int(1)),
                y: Expr::Literal(Value::Int(2)),
            }
        );
        assert_eq!(
            *if_.statement,
            Node::Block(StatementBlock {
                statements: vec![Node::command("print", vec![lit("yes")])],
            })
        );
        let Some(else_) = if_.else_ else {
            panic!("expected else branch");
        };
        let Node::Block(block) = *else_ else {
            panic!("expected block");
        };
        assert_eq!(block.statements.len(), 2);
    }

    #[test]
    fn nested_conditional_is_unwrapped() {
        let Node::If(if_) = single("if ((true == $flag)) { }") else {
            panic!("expected if");
        };
        assert!(matches!(if_.conditional, Conditional::IsEqualTo { .. }));
        assert_eq!(*if_.statement, Node::Block(StatementBlock::default()));
        assert!(if_.else_.is_none());
    }

    #[test]
    fn statements_split_on_semicolons() {
        let program = parser().parse("x = 1; $x; print \"a;b\";").unwrap();
        assert_eq!(program.statements.len(), 3);
        assert_eq!(
            program.statements[1],
            Node::Expr(Expr::EnvVar(EnvVar {
                name: "x".to_string()
            }))
        );
    }

    #[test]
    fn keyword_in_quotes_is_a_string() {
        assert_eq!(single("print \"if\""), Node::command("print", vec![lit("if")]));
    }

    #[test]
    fn unexpected_token_reports_offset() {
        let err = parser().parse("print )").unwrap_err();
        match err {
            ParseError::UnexpectedToken { found, offset, .. } => {
                assert_eq!(found, ")");
                assert_eq!(offset, 6);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unexpected_end_lists_expectations() {
        let err = parser().parse("if (1 == 1)").unwrap_err();
        let ParseError::UnexpectedEnd { expected } = err else {
            panic!("expected UnexpectedEnd, got {err:?}");
        };
        assert_eq!(expected, vec!["\"{\"".to_string()]);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            parser().parse("   "),
            Err(ParseError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn raw_tree_keeps_named_tokens_only() {
        let tree = parser().parse_tree("x = \"a\"").unwrap();
        assert_eq!(tree.pretty(), "start\n  assignment\n    x\n    =\n    string\t\"a\"\n");
    }

    #[test]
    fn broken_grammar_fails_construction() {
        assert!(Parser::from_grammar("start: nothing_here").is_err());
    }
}
