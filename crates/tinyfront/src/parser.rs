//! Runtime parser definition.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, TerminalID},
    lr1::NodeID,
    scan::Token,
    table::{Action, ParseTable},
    types::Map,
    util::display_fn,
};
use std::fmt;
use tinyfront_runtime::{ParseAction, ParseNode};

/// The concrete parse tree produced from scanned tokens.
pub type Tree = ParseNode<Token, NonterminalID>;

/// A parse table bundled with what the driver needs to know about the
/// grammar: lexical class names and the shape of each rule.
#[derive(Debug)]
pub struct ParseDefinition {
    table: ParseTable,
    terminals: Map<String, TerminalID>,
    rules: Map<RuleID, (NonterminalID, usize)>,
}

impl ParseDefinition {
    pub fn new(grammar: &Grammar, table: ParseTable) -> Self {
        let terminals = grammar
            .terminals
            .values()
            .filter(|t| t.id() != TerminalID::EOI)
            .filter_map(|t| Some((t.export_name()?.to_owned(), t.id())))
            .collect();
        let rules = grammar
            .rules
            .values()
            .map(|rule| (rule.id(), (rule.left(), rule.right().len())))
            .collect();
        Self {
            table,
            terminals,
            rules,
        }
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }
}

impl tinyfront_runtime::ParseTable for ParseDefinition {
    type State = NodeID;
    type Terminal = TerminalID;
    type Nonterminal = NonterminalID;
    type Rule = RuleID;

    fn initial_state(&self) -> Self::State {
        NodeID::START
    }

    fn terminal(&self, class: &str) -> Option<Self::Terminal> {
        self.terminals.get(class).copied()
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> Option<ParseAction<Self::State, Self::Nonterminal, Self::Rule>> {
        let lookahead = lookahead.unwrap_or(TerminalID::EOI);
        match self.table.action(current, lookahead)? {
            Action::Shift(next) => Some(ParseAction::Shift(next)),
            Action::Reduce(rule) => {
                let (lhs, n) = *self.rules.get(&rule)?;
                Some(ParseAction::Reduce { rule, lhs, n })
            }
            Action::Accept => Some(ParseAction::Accept),
        }
    }

    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
        self.table.goto(current, symbol)
    }
}

/// Render a parse tree with one node per line, indented by depth.
pub fn display_tree<'t>(tree: &'t Tree, g: &'t Grammar) -> impl fmt::Display + 't {
    display_fn(move |f| {
        let mut res = Ok(());
        tree.walk(|depth, node| {
            if res.is_err() {
                return;
            }
            res = match node {
                ParseNode::Leaf(token) => writeln!(f, "{:indent$}{}", "", token, indent = depth * 2),
                ParseNode::Branch { symbol, .. } => {
                    writeln!(f, "{:indent$}{}", "", g.nonterminals[symbol], indent = depth * 2)
                }
            };
        });
        res
    })
}
