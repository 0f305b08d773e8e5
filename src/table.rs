//! SLR(1) table construction.
//!
//! Builds the canonical LR(0) item sets of a [`Grammar`] and fills the
//! shift/reduce table, resolving reductions with FOLLOW sets. Any cell that
//! would hold two actions is reported as a [`GrammarError::Conflict`]; the
//! grammar has to be unambiguous at this level, there are no precedence rules.

use crate::error::GrammarError;
use crate::grammar::{ACCEPT_RULE, END, Grammar, Symbol};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Shift(usize),
    Reduce(usize),
    Accept,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Item {
    production: usize,
    dot: usize,
}

#[derive(Debug)]
pub struct ParseTable {
    actions: Vec<HashMap<usize, Action>>,
    gotos: Vec<HashMap<usize, usize>>,
}

impl ParseTable {
    pub fn build(grammar: &Grammar) -> Result<Self, GrammarError> {
        Builder::new(grammar).build()
    }

    pub fn action(&self, state: usize, terminal: usize) -> Option<Action> {
        self.actions[state].get(&terminal).copied()
    }

    pub fn goto(&self, state: usize, rule: usize) -> Option<usize> {
        self.gotos[state].get(&rule).copied()
    }

    /// Terminals with an action in `state`, for error messages.
    pub fn expected(&self, state: usize) -> Vec<usize> {
        let mut terminals: Vec<usize> = self.actions[state].keys().copied().collect();
        terminals.sort_unstable();
        terminals
    }

    pub fn state_count(&self) -> usize {
        self.actions.len()
    }
}

struct Builder<'g> {
    grammar: &'g Grammar,
    by_rule: Vec<Vec<usize>>,
    nullable: Vec<bool>,
    first: Vec<BTreeSet<usize>>,
    follow: Vec<BTreeSet<usize>>,
}

impl<'g> Builder<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        let mut by_rule = vec![Vec::new(); grammar.rules.len()];
        for (idx, production) in grammar.productions.iter().enumerate() {
            by_rule[production.rule].push(idx);
        }
        let mut builder = Builder {
            grammar,
            by_rule,
            nullable: vec![false; grammar.rules.len()],
            first: vec![BTreeSet::new(); grammar.rules.len()],
            follow: vec![BTreeSet::new(); grammar.rules.len()],
        };
        builder.compute_first();
        builder.compute_follow();
        builder
    }

    fn compute_first(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            for production in &self.grammar.productions {
                let (first, nullable) = self.first_of(&production.symbols);
                let rule = production.rule;
                if nullable && !self.nullable[rule] {
                    self.nullable[rule] = true;
                    changed = true;
                }
                let before = self.first[rule].len();
                self.first[rule].extend(first);
                changed |= self.first[rule].len() != before;
            }
        }
    }

    fn compute_follow(&mut self) {
        self.follow[ACCEPT_RULE].insert(END);
        let mut changed = true;
        while changed {
            changed = false;
            for production in &self.grammar.productions {
                for (pos, symbol) in production.symbols.iter().enumerate() {
                    let Symbol::Rule(target) = *symbol else {
                        continue;
                    };
                    let (mut additions, rest_nullable) =
                        self.first_of(&production.symbols[pos + 1..]);
                    if rest_nullable {
                        additions.extend(self.follow[production.rule].iter().copied());
                    }
                    let before = self.follow[target].len();
                    self.follow[target].extend(additions);
                    changed |= self.follow[target].len() != before;
                }
            }
        }
    }

    /// FIRST set of a symbol sequence and whether the whole sequence can be empty.
    fn first_of(&self, symbols: &[Symbol]) -> (BTreeSet<usize>, bool) {
        let mut first = BTreeSet::new();
        for symbol in symbols {
            match *symbol {
                Symbol::Terminal(t) => {
                    first.insert(t);
                    return (first, false);
                }
                Symbol::Rule(r) => {
                    first.extend(self.first[r].iter().copied());
                    if !self.nullable[r] {
                        return (first, false);
                    }
                }
            }
        }
        (first, true)
    }

    fn next_symbol(&self, item: Item) -> Option<Symbol> {
        self.grammar.productions[item.production]
            .symbols
            .get(item.dot)
            .copied()
    }

    fn closure(&self, kernel: BTreeSet<Item>) -> BTreeSet<Item> {
        let mut items = kernel;
        let mut pending: Vec<Item> = items.iter().copied().collect();
        while let Some(item) = pending.pop() {
            if let Some(Symbol::Rule(rule)) = self.next_symbol(item) {
                for &production in &self.by_rule[rule] {
                    let new = Item { production, dot: 0 };
                    if items.insert(new) {
                        pending.push(new);
                    }
                }
            }
        }
        items
    }

    fn build(self) -> Result<ParseTable, GrammarError> {
        let start = self.closure(BTreeSet::from([Item {
            production: 0,
            dot: 0,
        }]));
        let mut states = vec![start.clone()];
        let mut index: HashMap<BTreeSet<Item>, usize> = HashMap::from([(start, 0)]);
        let mut transitions: Vec<Vec<(Symbol, usize)>> = Vec::new();

        let mut current = 0;
        while current < states.len() {
            let mut kernels: Vec<(Symbol, BTreeSet<Item>)> = Vec::new();
            for &item in &states[current] {
                let Some(symbol) = self.next_symbol(item) else {
                    continue;
                };
                let advanced = Item {
                    production: item.production,
                    dot: item.dot + 1,
                };
                match kernels.iter_mut().find(|(s, _)| *s == symbol) {
                    Some((_, kernel)) => {
                        kernel.insert(advanced);
                    }
                    None => kernels.push((symbol, BTreeSet::from([advanced]))),
                }
            }

            let mut edges = Vec::with_capacity(kernels.len());
            for (symbol, kernel) in kernels {
                let target = self.closure(kernel);
                let id = match index.get(&target) {
                    Some(&id) => id,
                    None => {
                        let id = states.len();
                        index.insert(target.clone(), id);
                        states.push(target);
                        id
                    }
                };
                edges.push((symbol, id));
            }
            transitions.push(edges);
            current += 1;
        }

        let mut actions = vec![HashMap::new(); states.len()];
        let mut gotos = vec![HashMap::new(); states.len()];
        for (state, edges) in transitions.iter().enumerate() {
            for &(symbol, target) in edges {
                match symbol {
                    Symbol::Terminal(t) => {
                        self.set_action(&mut actions[state], state, t, Action::Shift(target))?
                    }
                    Symbol::Rule(r) => {
                        gotos[state].insert(r, target);
                    }
                }
            }
        }
        for (state, items) in states.iter().enumerate() {
            for &item in items {
                if self.next_symbol(item).is_some() {
                    continue;
                }
                if item.production == 0 {
                    self.set_action(&mut actions[state], state, END, Action::Accept)?;
                    continue;
                }
                let rule = self.grammar.productions[item.production].rule;
                for &t in &self.follow[rule] {
                    self.set_action(
                        &mut actions[state],
                        state,
                        t,
                        Action::Reduce(item.production),
                    )?;
                }
            }
        }

        log::debug!(
            "built parse table: {} states, {} productions",
            states.len(),
            self.grammar.productions.len()
        );
        Ok(ParseTable { actions, gotos })
    }

    fn set_action(
        &self,
        row: &mut HashMap<usize, Action>,
        state: usize,
        terminal: usize,
        action: Action,
    ) -> Result<(), GrammarError> {
        match row.get(&terminal) {
            Some(&existing) if existing != action => {
                let kind = match (existing, action) {
                    (Action::Reduce(_), Action::Reduce(_)) => "reduce/reduce",
                    _ => "shift/reduce",
                };
                Err(GrammarError::Conflict {
                    kind,
                    state,
                    symbol: self.grammar.terminals[terminal].to_string(),
                })
            }
            _ => {
                row.insert(terminal, action);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::DEFAULT_GRAMMAR;

    #[test]
    fn default_grammar_has_no_conflicts() {
        let grammar = Grammar::parse(DEFAULT_GRAMMAR).unwrap();
        let table = ParseTable::build(&grammar).unwrap();
        assert!(table.state_count() > 10);
    }

    #[test]
    fn ambiguous_grammar_is_rejected() {
        let grammar = Grammar::parse("start: expr\nexpr: expr expr | WORD").unwrap();
        let err = ParseTable::build(&grammar).unwrap_err();
        assert!(matches!(err, GrammarError::Conflict { kind: "shift/reduce", .. }));
    }

    #[test]
    fn reduce_reduce_is_reported() {
        let grammar = Grammar::parse("start: a | b\na: WORD\nb: WORD").unwrap();
        let err = ParseTable::build(&grammar).unwrap_err();
        assert!(matches!(err, GrammarError::Conflict { kind: "reduce/reduce", .. }));
    }

    #[test]
    fn empty_alternatives_are_supported() {
        let grammar = Grammar::parse("start: WORD tail\ntail: | INT").unwrap();
        let table = ParseTable::build(&grammar).unwrap();
        assert!(!table.expected(0).is_empty());
    }
}
