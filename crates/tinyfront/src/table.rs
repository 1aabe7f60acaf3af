//! Calculation of LR(1) parse table with conflict resolution.

use crate::{
    grammar::{Assoc, Grammar, NonterminalID, Precedence, RuleID, SymbolID, TerminalID},
    lr1::{Config, LR1Automaton, NodeID},
    types::Map,
    util::display_fn,
};
use std::{cmp::Ordering, fmt};

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("shift/accept conflict in state {state}")]
    ShiftAcceptConflict { state: NodeID },

    #[error("reduce/accept conflict in state {state}")]
    ReduceAcceptConflict { state: NodeID },
}

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
///
/// A missing entry rejects the lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(NodeID),

    /// Reduce to the specified production rule.
    Reduce(RuleID),

    Accept,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

/// A lookahead for which several actions competed and precedence did not
/// settle the choice.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub state: NodeID,
    pub lookahead: TerminalID,
    pub kind: ConflictKind,
    pub shift: Option<NodeID>,
    pub reduces: Vec<RuleID>,
    /// The action left in the table.
    pub chosen: Action,
}

#[derive(Debug, Default)]
#[non_exhaustive]
pub struct TableRow {
    pub actions: Map<TerminalID, Action>,
    pub gotos: Map<NonterminalID, NodeID>,
}

#[derive(Debug)]
pub struct ParseTable {
    states: Vec<TableRow>,
    conflicts: Vec<Conflict>,
}

impl ParseTable {
    pub fn generate(g: &Grammar) -> Result<Self, TableError> {
        Self::generate_with_config(g, &Config::new())
    }

    pub fn generate_with_config(g: &Grammar, config: &Config) -> Result<Self, TableError> {
        let automaton = LR1Automaton::generate_with_config(g, config);
        Self::from_automaton(g, &automaton)
    }

    /// Derive the table from the states of an LR(1) automaton.
    ///
    /// The rows are indexed by the node IDs of `automaton`.
    pub fn from_automaton(g: &Grammar, automaton: &LR1Automaton) -> Result<Self, TableError> {
        let span = tracing::trace_span!("table");
        let _entered = span.enter();

        let mut states = Vec::with_capacity(automaton.len());
        let mut conflicts = vec![];

        for (id, node) in automaton.nodes() {
            #[derive(Default)]
            struct PendingAction {
                shift: Option<NodeID>,
                reduces: Vec<RuleID>,
            }
            let mut pending_actions = Map::<TerminalID, PendingAction>::default();
            let mut row = TableRow::default();

            for (symbol, target) in node.edges() {
                match symbol {
                    SymbolID::T(t) => pending_actions.entry(t).or_default().shift = Some(target),
                    SymbolID::N(n) => {
                        row.gotos.insert(n, target);
                    }
                }
            }
            for (rule, lookaheads) in node.reductions() {
                for t in lookaheads {
                    pending_actions.entry(*t).or_default().reduces.push(rule);
                }
            }

            for (t, pending) in pending_actions {
                let resolved = resolve_conflict(g, id, t, pending.shift, &pending.reduces)?;
                if let Some(conflict) = resolved.conflict {
                    tracing::warn!(
                        "{:?} conflict in state {} on `{}', chose {:?}",
                        conflict.kind,
                        id,
                        g.terminals[&t],
                        conflict.chosen
                    );
                    conflicts.push(conflict);
                }
                if let Some(action) = resolved.action {
                    row.actions.insert(t, action);
                }
            }

            states.push(row);
        }

        tracing::debug!(
            "parse table: {} states, {} conflict(s)",
            states.len(),
            conflicts.len()
        );
        Ok(Self { states, conflicts })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn row(&self, state: NodeID) -> Option<&TableRow> {
        self.states.get(state.index())
    }

    pub fn action(&self, state: NodeID, lookahead: TerminalID) -> Option<Action> {
        self.row(state)?.actions.get(&lookahead).copied()
    }

    pub fn goto(&self, state: NodeID, symbol: NonterminalID) -> Option<NodeID> {
        self.row(state)?.gotos.get(&symbol).copied()
    }

    /// The conflicts settled by the default policy, in state order.
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, row) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {:02}", i)?;
                writeln!(f, "## actions")?;
                for (token, action) in &row.actions {
                    let token = &g.terminals[token];
                    match action {
                        Action::Shift(n) => writeln!(f, "- {} => shift({:02})", token, n)?,
                        Action::Reduce(reduce) => {
                            let reduce = &g.rules[reduce];
                            writeln!(f, "- {} => reduce({})", token, reduce.display(g))?;
                        }
                        Action::Accept => writeln!(f, "- {} => accept", token)?,
                    }
                }

                writeln!(f, "## gotos")?;
                for (symbol, goto) in &row.gotos {
                    writeln!(f, "- {} => goto({:02})", g.nonterminals[symbol], goto)?;
                }
            }

            if !self.conflicts.is_empty() {
                writeln!(f, "\n#### Conflicts")?;
                for conflict in &self.conflicts {
                    writeln!(
                        f,
                        "- state {:02} on {}: {:?}",
                        conflict.state, g.terminals[&conflict.lookahead], conflict.kind
                    )?;
                    if let Some(n) = conflict.shift {
                        writeln!(f, "  - shift({:02})", n)?;
                    }
                    for reduce in &conflict.reduces {
                        writeln!(f, "  - reduce({})", g.rules[reduce].display(g))?;
                    }
                }
            }
            Ok(())
        })
    }
}

struct Resolved {
    action: Option<Action>,
    conflict: Option<Conflict>,
}

/// Pick one action for a lookahead, using precedence/associativity first and
/// then preferring shift and the earliest rule.
fn resolve_conflict(
    g: &Grammar,
    state: NodeID,
    lookahead: TerminalID,
    shift: Option<NodeID>,
    reduces: &[RuleID],
) -> Result<Resolved, TableError> {
    let resolved = |action: Option<Action>| Resolved {
        action,
        conflict: None,
    };

    if reduces.contains(&RuleID::ACCEPT) {
        if shift.is_some() {
            return Err(TableError::ShiftAcceptConflict { state });
        }
        if reduces.len() > 1 {
            return Err(TableError::ReduceAcceptConflict { state });
        }
        return Ok(resolved(Some(Action::Accept)));
    }

    // reduces are listed in rule order
    let reduce = match (shift, reduces) {
        (Some(next), []) => return Ok(resolved(Some(Action::Shift(next)))),
        (None, [reduce]) => return Ok(resolved(Some(Action::Reduce(*reduce)))),
        (None, []) => return Ok(resolved(None)),
        (_, [first, ..]) => *first,
    };
    let conflict = |kind, chosen| Conflict {
        state,
        lookahead,
        kind,
        shift,
        reduces: reduces.to_owned(),
        chosen,
    };

    let Some(next) = shift else {
        let chosen = Action::Reduce(reduce);
        return Ok(Resolved {
            action: Some(chosen),
            conflict: Some(conflict(ConflictKind::ReduceReduce, chosen)),
        });
    };

    let shift_prec = g.terminals[&lookahead].precedence();
    let reduce_prec = g.rules[&reduce].precedence(g);
    let action = match compare_precs(shift_prec, reduce_prec) {
        Some(PrecDiff::Left) => Some(Action::Shift(next)),
        Some(PrecDiff::Right) => Some(Action::Reduce(reduce)),
        Some(PrecDiff::Neither) => None,
        None => {
            let chosen = Action::Shift(next);
            return Ok(Resolved {
                action: Some(chosen),
                conflict: Some(conflict(ConflictKind::ShiftReduce, chosen)),
            });
        }
    };

    // precedence settles shift/reduce only; competing reduces are still reported
    let conflict = match action {
        Some(chosen) if reduces.len() > 1 => Some(conflict(ConflictKind::ReduceReduce, chosen)),
        _ => None,
    };
    Ok(Resolved { action, conflict })
}

#[derive(Copy, Clone)]
enum PrecDiff {
    Left,
    Right,
    Neither,
}
fn compare_precs(
    shift_prec: Option<Precedence>,
    reduce_prec: Option<Precedence>,
) -> Option<PrecDiff> {
    match (shift_prec, reduce_prec) {
        (Some(p1), Some(p2)) => match Ord::cmp(&p1.priority, &p2.priority) {
            Ordering::Greater => Some(PrecDiff::Left),
            Ordering::Less => Some(PrecDiff::Right),
            Ordering::Equal => match p1.assoc {
                Assoc::Left => Some(PrecDiff::Right),
                Assoc::Right => Some(PrecDiff::Left),
                Assoc::Nonassoc => Some(PrecDiff::Neither),
            },
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    fn binary_rule(g: &Grammar, op: &str) -> RuleID {
        let op = g.terminal_by_name(op).unwrap();
        g.rules
            .values()
            .find(|r| r.right().len() == 3 && r.right()[1] == T(op))
            .unwrap()
            .id()
    }

    /// The state reached after reading `E op E` from the start.
    fn after_binary(g: &Grammar, automaton: &LR1Automaton, op: &str) -> NodeID {
        let e = N(g.nonterminal_by_name("E").unwrap());
        let op = T(g.terminal_by_name(op).unwrap());
        let mut state = NodeID::START;
        for symbol in [e, op, e] {
            state = automaton.node(state).edge(symbol).unwrap();
        }
        state
    }

    #[test]
    fn unambiguous_grammar_has_no_conflicts() {
        let g = Grammar::from_str("%token c d\nS -> C C\nC -> c C | d").unwrap();
        let table = ParseTable::generate(&g).unwrap();
        eprintln!("{}", table.display(&g));
        assert_eq!(table.len(), 10);
        assert!(table.conflicts().is_empty());

        let c = g.terminal_by_name("c").unwrap();
        let d = g.terminal_by_name("d").unwrap();
        assert!(matches!(table.action(NodeID::START, c), Some(Action::Shift(_))));
        assert!(matches!(table.action(NodeID::START, d), Some(Action::Shift(_))));
        assert_eq!(table.action(NodeID::START, TerminalID::EOI), None);

        let s = g.nonterminal_by_name("S").unwrap();
        let accepting = table.goto(NodeID::START, s).unwrap();
        assert_eq!(
            table.action(accepting, TerminalID::EOI),
            Some(Action::Accept)
        );
    }

    #[test]
    fn precedence_and_associativity() {
        let g = Grammar::from_str(
            "%token NUM\n%left PLUS\n%left STAR\nE -> E PLUS E | E STAR E | NUM",
        )
        .unwrap();
        let automaton = LR1Automaton::generate(&g);
        let table = ParseTable::from_automaton(&g, &automaton).unwrap();
        assert!(table.conflicts().is_empty());

        let plus = g.terminal_by_name("PLUS").unwrap();
        let star = g.terminal_by_name("STAR").unwrap();

        let state = after_binary(&g, &automaton, "PLUS");
        assert!(matches!(table.action(state, star), Some(Action::Shift(_))));
        assert_eq!(
            table.action(state, plus),
            Some(Action::Reduce(binary_rule(&g, "PLUS")))
        );

        let state = after_binary(&g, &automaton, "STAR");
        assert_eq!(
            table.action(state, plus),
            Some(Action::Reduce(binary_rule(&g, "STAR")))
        );
        assert_eq!(
            table.action(state, star),
            Some(Action::Reduce(binary_rule(&g, "STAR")))
        );
    }

    #[test]
    fn nonassoc_leaves_entry_absent() {
        let g = Grammar::from_str("%token NUM\n%nonassoc EQ\nE -> E EQ E | NUM").unwrap();
        let automaton = LR1Automaton::generate(&g);
        let table = ParseTable::from_automaton(&g, &automaton).unwrap();
        assert!(table.conflicts().is_empty());

        let eq = g.terminal_by_name("EQ").unwrap();
        let state = after_binary(&g, &automaton, "EQ");
        assert_eq!(table.action(state, eq), None);
        assert_eq!(
            table.action(state, TerminalID::EOI),
            Some(Action::Reduce(binary_rule(&g, "EQ")))
        );
    }

    #[test]
    fn shift_wins_without_precedence() {
        let g = Grammar::from_str("%token NUM PLUS\nE -> E PLUS E | NUM").unwrap();
        let automaton = LR1Automaton::generate(&g);
        let table = ParseTable::from_automaton(&g, &automaton).unwrap();

        let plus = g.terminal_by_name("PLUS").unwrap();
        let state = after_binary(&g, &automaton, "PLUS");
        let action = table.action(state, plus);
        assert!(matches!(action, Some(Action::Shift(_))));

        let conflict = table
            .conflicts()
            .iter()
            .find(|c| c.state == state && c.lookahead == plus)
            .unwrap();
        assert_eq!(conflict.kind, ConflictKind::ShiftReduce);
        assert_eq!(Some(conflict.chosen), action);
        assert_eq!(conflict.reduces, [binary_rule(&g, "PLUS")]);
    }

    #[test]
    fn earliest_rule_wins_reduce_reduce() {
        let g = Grammar::from_str("%token x\nS -> A | B\nA -> x\nB -> x").unwrap();
        let automaton = LR1Automaton::generate(&g);
        let table = ParseTable::from_automaton(&g, &automaton).unwrap();

        let x = g.terminal_by_name("x").unwrap();
        let a = g.nonterminal_by_name("A").unwrap();
        let a_rule = g.rules.values().find(|r| r.left() == a).unwrap().id();

        let state = automaton.node(NodeID::START).edge(T(x)).unwrap();
        assert_eq!(
            table.action(state, TerminalID::EOI),
            Some(Action::Reduce(a_rule))
        );
        assert_eq!(table.conflicts().len(), 1);
        assert_eq!(table.conflicts()[0].kind, ConflictKind::ReduceReduce);
        assert_eq!(table.conflicts()[0].reduces.len(), 2);
    }
}
