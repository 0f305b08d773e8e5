//! Loader for the declarative grammar definition.
//!
//! The definition is a list of rules, `name: alternative | alternative ...`,
//! where each alternative is a sequence of rule names (lowercase), lexer
//! terminals (UPPERCASE) and quoted literal terminals. See `turtle.grammar`.

use crate::error::GrammarError;
use crate::lexer::{LexKind, Lexeme};
use std::collections::HashMap;
use std::fmt;

/// The grammar the shell ships with.
pub const DEFAULT_GRAMMAR: &str = include_str!("turtle.grammar");

/// Name of the rule every parse starts from.
pub const START_RULE: &str = "start";

/// A grammar symbol: index into [`Grammar::terminals`] or [`Grammar::rules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Terminal(usize),
    Rule(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalDef {
    End,
    Named(LexKind),
    Literal(String),
}

impl TerminalDef {
    /// Literal terminals are punctuation and keywords; trees leave them out.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, TerminalDef::Literal(_))
    }
}

impl fmt::Display for TerminalDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalDef::End => f.write_str("end of input"),
            TerminalDef::Named(kind) => f.write_str(kind.terminal_name()),
            TerminalDef::Literal(text) => write!(f, "{text:?}"),
        }
    }
}

/// How a rule's node appears in the tree built from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Always produces its own node.
    Keep,
    /// `?rule`: replaced by its child when it has exactly one.
    Inline,
    /// `_rule`: children are spliced into the parent.
    Splice,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub shape: Shape,
}

#[derive(Debug, Clone)]
pub struct Production {
    pub rule: usize,
    pub symbols: Vec<Symbol>,
}

#[derive(Debug, Clone)]
pub struct Grammar {
    pub rules: Vec<Rule>,
    /// Production 0 is the augmented `$accept: start`.
    pub productions: Vec<Production>,
    /// Terminal 0 is end of input.
    pub terminals: Vec<TerminalDef>,
    literals: HashMap<String, usize>,
    named: HashMap<LexKind, usize>,
}

pub const END: usize = 0;
pub const ACCEPT_RULE: usize = 0;

impl Grammar {
    pub fn parse(text: &str) -> Result<Self, GrammarError> {
        let tokens = tokenize(text)?;
        let defs = split_rules(&tokens)?;
        Self::build(defs)
    }

    /// Which terminal a lexeme stands for, if the grammar has one.
    ///
    /// Literal terminals win over named ones, so `if` lexed as a word is the
    /// keyword and `==` is the comparison rather than a plain word.
    pub fn terminal_for(&self, lexeme: &Lexeme) -> Option<usize> {
        if lexeme.kind.may_be_literal() {
            if let Some(&id) = self.literals.get(&lexeme.text) {
                return Some(id);
            }
        }
        self.named.get(&lexeme.kind).copied()
    }

    fn build(defs: Vec<RuleDef>) -> Result<Self, GrammarError> {
        let mut rules = vec![Rule {
            name: "$accept".to_string(),
            shape: Shape::Keep,
        }];
        let mut rule_ids = HashMap::new();
        for def in &defs {
            if rule_ids.contains_key(&def.name) {
                return Err(GrammarError::Syntax {
                    line: def.line,
                    message: format!("rule {:?} defined twice", def.name),
                });
            }
            rule_ids.insert(def.name.clone(), rules.len());
            rules.push(Rule {
                name: def.name.clone(),
                shape: def.shape,
            });
        }
        let start = *rule_ids.get(START_RULE).ok_or(GrammarError::MissingStart)?;

        let mut grammar = Grammar {
            rules,
            productions: vec![Production {
                rule: ACCEPT_RULE,
                symbols: vec![Symbol::Rule(start)],
            }],
            terminals: vec![TerminalDef::End],
            literals: HashMap::new(),
            named: HashMap::new(),
        };

        for def in defs {
            let rule = rule_ids[&def.name];
            for alternative in def.alternatives {
                let mut symbols = Vec::with_capacity(alternative.len());
                for item in alternative {
                    symbols.push(match item {
                        Item::Literal(text) => Symbol::Terminal(grammar.literal(text)),
                        Item::Name(name) if is_terminal_name(&name) => {
                            let kind = LexKind::from_terminal_name(&name)
                                .ok_or(GrammarError::UnknownTerminal(name))?;
                            Symbol::Terminal(grammar.named(kind))
                        }
                        Item::Name(name) => Symbol::Rule(
                            *rule_ids
                                .get(&name)
                                .ok_or(GrammarError::UndefinedRule(name))?,
                        ),
                    });
                }
                grammar.productions.push(Production { rule, symbols });
            }
        }
        Ok(grammar)
    }

    fn literal(&mut self, text: String) -> usize {
        if let Some(&id) = self.literals.get(&text) {
            return id;
        }
        let id = self.terminals.len();
        self.terminals.push(TerminalDef::Literal(text.clone()));
        self.literals.insert(text, id);
        id
    }

    fn named(&mut self, kind: LexKind) -> usize {
        if let Some(&id) = self.named.get(&kind) {
            return id;
        }
        let id = self.terminals.len();
        self.terminals.push(TerminalDef::Named(kind));
        self.named.insert(kind, id);
        id
    }
}

fn is_terminal_name(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_uppercase() || c == '_')
}

#[derive(Debug, Clone, PartialEq)]
enum GToken {
    Name(String),
    Literal(String),
    Colon,
    Pipe,
}

fn tokenize(text: &str) -> Result<Vec<(GToken, usize)>, GrammarError> {
    let mut tokens = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '#' => break,
                c if c.is_whitespace() => {}
                ':' => tokens.push((GToken::Colon, line_no)),
                '|' => tokens.push((GToken::Pipe, line_no)),
                '"' => {
                    let mut literal = String::new();
                    loop {
                        match chars.next() {
                            Some('"') => break,
                            Some('\\') => literal.extend(chars.next()),
                            Some(c) => literal.push(c),
                            None => {
                                return Err(GrammarError::Syntax {
                                    line: line_no,
                                    message: "unterminated literal".to_string(),
                                });
                            }
                        }
                    }
                    if literal.is_empty() {
                        return Err(GrammarError::Syntax {
                            line: line_no,
                            message: "empty literal".to_string(),
                        });
                    }
                    tokens.push((GToken::Literal(literal), line_no));
                }
                c if c == '?' || c == '_' || c.is_ascii_alphabetic() => {
                    let mut name = c.to_string();
                    while let Some(&next) = chars.peek() {
                        if next == '_' || next.is_ascii_alphanumeric() {
                            name.push(next);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    tokens.push((GToken::Name(name), line_no));
                }
                other => {
                    return Err(GrammarError::Syntax {
                        line: line_no,
                        message: format!("unexpected character {other:?}"),
                    });
                }
            }
        }
    }
    Ok(tokens)
}

enum Item {
    Name(String),
    Literal(String),
}

struct RuleDef {
    name: String,
    shape: Shape,
    line: usize,
    alternatives: Vec<Vec<Item>>,
}

/// Groups the token stream into rule definitions. A rule starts wherever a
/// name is directly followed by `:`.
fn split_rules(tokens: &[(GToken, usize)]) -> Result<Vec<RuleDef>, GrammarError> {
    let mut defs: Vec<RuleDef> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let (token, line) = &tokens[i];
        let starts_rule = matches!(tokens.get(i + 1), Some((GToken::Colon, _)));
        match token {
            GToken::Name(raw) if starts_rule => {
                let (name, shape) = match raw.strip_prefix('?') {
                    Some(rest) => (rest.to_string(), Shape::Inline),
                    None if raw.starts_with('_') => (raw.clone(), Shape::Splice),
                    None => (raw.clone(), Shape::Keep),
                };
                if name.is_empty() || is_terminal_name(&name) {
                    return Err(GrammarError::Syntax {
                        line: *line,
                        message: format!("invalid rule name {raw:?}"),
                    });
                }
                defs.push(RuleDef {
                    name,
                    shape,
                    line: *line,
                    alternatives: vec![Vec::new()],
                });
                i += 2;
                continue;
            }
            _ => {}
        }

        let Some(def) = defs.last_mut() else {
            return Err(GrammarError::Syntax {
                line: *line,
                message: "expected a rule definition".to_string(),
            });
        };
        match token {
            GToken::Pipe => def.alternatives.push(Vec::new()),
            GToken::Colon => {
                return Err(GrammarError::Syntax {
                    line: *line,
                    message: "unexpected ':'".to_string(),
                });
            }
            GToken::Name(name) => {
                if name.starts_with('?') {
                    return Err(GrammarError::Syntax {
                        line: *line,
                        message: format!("'?' is only allowed on definitions: {name}"),
                    });
                }
                push_item(def, Item::Name(name.clone()));
            }
            GToken::Literal(text) => push_item(def, Item::Literal(text.clone())),
        }
        i += 1;
    }
    Ok(defs)
}

fn push_item(def: &mut RuleDef, item: Item) {
    if let Some(alternative) = def.alternatives.last_mut() {
        alternative.push(item);
    }
}
