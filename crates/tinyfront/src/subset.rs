//! Subset construction.

use crate::{
    automaton::{Automaton, StateID, Transition},
    regex::CharRange,
    types::Map,
};
use bit_set::BitSet;
use indexmap::map::Entry;
use std::collections::VecDeque;

/// Extend `set` with every state reachable through epsilon edges.
pub fn epsilon_closure(nfa: &Automaton, set: &mut BitSet) {
    let mut stack: Vec<usize> = set.iter().collect();
    while let Some(i) = stack.pop() {
        for edge in nfa.edges(StateID::new(i)) {
            if edge.is_epsilon() && set.insert(edge.to.index()) {
                stack.push(edge.to.index());
            }
        }
    }
}

/// The states reachable from any member of `set` by consuming `b`.
pub fn move_on(nfa: &Automaton, set: &BitSet, b: u8) -> BitSet {
    let mut next = BitSet::with_capacity(nfa.len());
    for i in set {
        for edge in nfa.edges(StateID::new(i)) {
            if edge.accepts(b) {
                next.insert(edge.to.index());
            }
        }
    }
    next
}

/// Convert an automaton into an equivalent deterministic one.
///
/// The resulting states are numbered in discovery order, starting from the
/// epsilon closure of the start state. A state accepts when any of its
/// underlying NFA states does, and takes the lowest tag among them.
pub fn determinize(nfa: &Automaton) -> Automaton {
    let span = tracing::trace_span!("determinize");
    let _entered = span.enter();

    let mut dfa = Automaton::new();
    let Some(start) = nfa.start() else {
        return dfa;
    };
    let alphabet = nfa.alphabet_bytes();

    let mut initial = BitSet::with_capacity(nfa.len());
    initial.insert(start.index());
    epsilon_closure(nfa, &mut initial);

    let mut seen: Map<BitSet, StateID> = Map::default();
    let mut pending: VecDeque<(StateID, BitSet)> = VecDeque::new();

    let dfa_start = dfa.add_state();
    dfa.set_start(dfa_start);
    seen.insert(initial.clone(), dfa_start);
    pending.push_back((dfa_start, initial));

    while let Some((from, set)) = pending.pop_front() {
        mark_accepting(nfa, &set, &mut dfa, from);

        for &b in &alphabet {
            let mut next = move_on(nfa, &set, b);
            if next.is_empty() {
                continue;
            }
            epsilon_closure(nfa, &mut next);

            let to = match seen.entry(next) {
                Entry::Occupied(entry) => *entry.get(),
                Entry::Vacant(entry) => {
                    let id = dfa.add_state();
                    pending.push_back((id, entry.key().clone()));
                    *entry.insert(id)
                }
            };
            let tag = edges_from_set(nfa, &set)
                .filter(|edge| edge.accepts(b))
                .filter_map(|edge| edge.tag)
                .min();
            dfa.add_transition(from, to, Some(CharRange::single(b)), tag);
        }
    }

    tracing::debug!(
        "determinize: {} NFA states -> {} DFA states",
        nfa.len(),
        dfa.len()
    );
    dfa
}

fn mark_accepting(nfa: &Automaton, set: &BitSet, dfa: &mut Automaton, id: StateID) {
    let mut accepting = set
        .iter()
        .map(|i| nfa.state(StateID::new(i)))
        .filter(|state| state.is_accepting())
        .peekable();
    if accepting.peek().is_none() {
        return;
    }
    match accepting.filter_map(|state| state.tag()).min() {
        Some(tag) => dfa.set_accepting(id, tag),
        None => dfa.set_accepting_untagged(id),
    }
}

fn edges_from_set<'a>(
    nfa: &'a Automaton,
    set: &'a BitSet,
) -> impl Iterator<Item = &'a Transition> + 'a {
    set.iter().flat_map(move |i| nfa.edges(StateID::new(i)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{automaton::Tag, regex};

    fn dfa(pattern: &str) -> Automaton {
        let postfix = regex::compile(pattern).unwrap();
        determinize(&Automaton::from_postfix(&postfix, Tag::new(0)).unwrap())
    }

    #[test]
    fn closure_follows_epsilon_chains() {
        let postfix = regex::compile("a*").unwrap();
        let nfa = Automaton::from_postfix(&postfix, Tag::new(0)).unwrap();
        let mut set = BitSet::new();
        set.insert(nfa.start().unwrap().index());
        epsilon_closure(&nfa, &mut set);
        assert!(set
            .iter()
            .any(|i| nfa.state(StateID::new(i)).is_accepting()));
    }

    #[test]
    fn no_epsilon_after_determinize() {
        for pattern in ["a(b|c)*d", "[0-9]+", "(a|ab)(c|bcd)", "x?y*z+"] {
            let dfa = dfa(pattern);
            assert!(dfa.transitions().all(|t| !t.is_epsilon()), "{}", pattern);
            assert!(dfa.is_deterministic(), "{}", pattern);
        }
    }

    #[test]
    fn preserves_language() {
        let dfa = dfa("a(b|c)*d");
        assert!(dfa.accepts(b"ad"));
        assert!(dfa.accepts(b"abcbcd"));
        assert!(!dfa.accepts(b"abcx"));
        assert!(!dfa.accepts(b"abc"));
    }

    #[test]
    fn byte_granularity() {
        let dfa = dfa("[a-c]");
        // one edge per byte of the range
        assert_eq!(dfa.edges(dfa.start().unwrap()).count(), 3);
    }

    #[test]
    fn overlapping_rules_take_lowest_tag() {
        let keyword = regex::compile("while").unwrap();
        let ident = regex::compile("[a-z]+").unwrap();
        let merged = Automaton::merge([
            Automaton::from_postfix(&keyword, Tag::new(0)).unwrap(),
            Automaton::from_postfix(&ident, Tag::new(1)).unwrap(),
        ]);
        let dfa = determinize(&merged);
        assert_eq!(dfa.recognize(b"while"), Some(Some(Tag::new(0))));
        assert_eq!(dfa.recognize(b"whilex"), Some(Some(Tag::new(1))));
        assert_eq!(dfa.recognize(b"w"), Some(Some(Tag::new(1))));
    }
}
