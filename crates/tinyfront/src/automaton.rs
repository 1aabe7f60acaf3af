//! Finite automata over bytes.
//!
//! An [`Automaton`] owns an arena of states and transitions addressed by
//! [`StateID`] and [`TransitionID`]. The same type holds NFAs produced by the
//! Thompson construction as well as the DFAs produced by subset construction
//! and minimization; a DFA is simply an automaton without epsilon edges.

use crate::{
    regex::{CharRange, RegexError, RegexToken},
    subset,
    types::Set,
    util::display_fn,
};
use bit_set::BitSet;
use std::fmt;

/// The identifier of a state in its owning automaton.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: u32,
}

impl StateID {
    pub(crate) const fn new(raw: usize) -> Self {
        assert!(raw <= u32::MAX as usize, "too many states");
        Self { raw: raw as u32 }
    }

    pub const fn index(self) -> usize {
        self.raw as usize
    }

    const fn offset(self, n: usize) -> Self {
        Self::new(self.index() + n)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TransitionID {
    raw: u32,
}

impl TransitionID {
    const fn new(raw: usize) -> Self {
        assert!(raw <= u32::MAX as usize, "too many transitions");
        Self { raw: raw as u32 }
    }

    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

/// The label attached to accepting states, naming the lexical rule they
/// accept for. Lower tags take priority when several rules overlap.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Tag {
    raw: u16,
}

impl Tag {
    pub const fn new(raw: usize) -> Self {
        assert!(raw <= u16::MAX as usize, "too many tags");
        Self { raw: raw as u16 }
    }

    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

#[derive(Debug, Clone, Default)]
pub struct State {
    transitions: Vec<TransitionID>,
    accepting: bool,
    tag: Option<Tag>,
}

impl State {
    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// The tag of an accepting state.
    pub fn tag(&self) -> Option<Tag> {
        if self.accepting {
            self.tag
        } else {
            None
        }
    }

    pub fn transitions(&self) -> &[TransitionID] {
        &self.transitions
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: StateID,
    pub to: StateID,
    /// The consumed input, or `None` for an epsilon edge.
    pub input: Option<CharRange>,
    pub tag: Option<Tag>,
}

impl Transition {
    pub fn is_epsilon(&self) -> bool {
        self.input.is_none()
    }

    pub fn accepts(&self, b: u8) -> bool {
        self.input.map_or(false, |range| range.contains(b))
    }
}

/// A transient pair of states spanning a partially built automaton.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub entry: StateID,
    pub exit: StateID,
}

#[derive(Debug, Clone, Default)]
pub struct Automaton {
    states: Vec<State>,
    transitions: Vec<Transition>,
    start: Option<StateID>,
    alphabet: Set<CharRange>,
}

impl Automaton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an NFA from a postfix token stream by Thompson construction.
    ///
    /// Every transition and the final accepting state carry `tag`.
    pub fn from_postfix(postfix: &[RegexToken], tag: Tag) -> Result<Self, RegexError> {
        let mut nfa = Self::new();
        let mut stack: Vec<Fragment> = vec![];

        for token in postfix {
            let fragment = match *token {
                RegexToken::Range(range) => {
                    let entry = nfa.add_state();
                    let exit = nfa.add_state();
                    nfa.add_transition(entry, exit, Some(range), Some(tag));
                    Fragment { entry, exit }
                }

                RegexToken::Concat => {
                    let right = stack.pop().ok_or(RegexError::MissingOperand)?;
                    let left = stack.pop().ok_or(RegexError::MissingOperand)?;
                    nfa.add_epsilon(left.exit, right.entry);
                    Fragment {
                        entry: left.entry,
                        exit: right.exit,
                    }
                }

                RegexToken::Alt => {
                    let right = stack.pop().ok_or(RegexError::MissingOperand)?;
                    let left = stack.pop().ok_or(RegexError::MissingOperand)?;
                    let entry = nfa.add_state();
                    let exit = nfa.add_state();
                    nfa.add_epsilon(entry, left.entry);
                    nfa.add_epsilon(entry, right.entry);
                    nfa.add_epsilon(left.exit, exit);
                    nfa.add_epsilon(right.exit, exit);
                    Fragment { entry, exit }
                }

                RegexToken::Star | RegexToken::Plus | RegexToken::Optional => {
                    let inner = stack.pop().ok_or(RegexError::MissingOperand)?;
                    let entry = nfa.add_state();
                    let exit = nfa.add_state();
                    nfa.add_epsilon(entry, inner.entry);
                    nfa.add_epsilon(inner.exit, exit);
                    if *token != RegexToken::Plus {
                        nfa.add_epsilon(entry, exit);
                    }
                    if *token != RegexToken::Optional {
                        nfa.add_epsilon(inner.exit, inner.entry);
                    }
                    Fragment { entry, exit }
                }

                RegexToken::LParen | RegexToken::RParen => {
                    return Err(RegexError::UnmatchedParen);
                }
            };
            stack.push(fragment);
        }

        let fragment = stack.pop().ok_or(RegexError::Empty)?;
        if !stack.is_empty() {
            return Err(RegexError::Malformed);
        }
        nfa.start = Some(fragment.entry);
        nfa.set_accepting(fragment.exit, tag);

        tracing::trace!(
            "thompson: {} states, {} transitions",
            nfa.states.len(),
            nfa.transitions.len()
        );
        Ok(nfa)
    }

    /// Join several automata under a fresh start state.
    ///
    /// The inputs are consumed and their arenas are moved into the result;
    /// automata without a start state are skipped.
    pub fn merge<I>(automata: I) -> Self
    where
        I: IntoIterator<Item = Automaton>,
    {
        let mut merged = Self::new();
        let start = merged.add_state();
        merged.start = Some(start);

        for automaton in automata {
            let Some(entry) = automaton.start else {
                continue;
            };
            let state_offset = merged.states.len();
            let transition_offset = merged.transitions.len();

            merged
                .states
                .extend(automaton.states.into_iter().map(|mut state| {
                    for t in &mut state.transitions {
                        *t = TransitionID::new(t.index() + transition_offset);
                    }
                    state
                }));
            merged
                .transitions
                .extend(automaton.transitions.into_iter().map(|t| Transition {
                    from: t.from.offset(state_offset),
                    to: t.to.offset(state_offset),
                    ..t
                }));
            merged.alphabet.extend(automaton.alphabet);

            merged.add_epsilon(start, entry.offset(state_offset));
        }

        tracing::trace!(
            "merge: {} states, {} transitions",
            merged.states.len(),
            merged.transitions.len()
        );
        merged
    }

    pub fn add_state(&mut self) -> StateID {
        let id = StateID::new(self.states.len());
        self.states.push(State::default());
        id
    }

    pub fn add_transition(
        &mut self,
        from: StateID,
        to: StateID,
        input: Option<CharRange>,
        tag: Option<Tag>,
    ) -> TransitionID {
        let id = TransitionID::new(self.transitions.len());
        self.transitions.push(Transition {
            from,
            to,
            input,
            tag,
        });
        self.states[from.index()].transitions.push(id);
        if let Some(range) = input {
            self.alphabet.insert(range);
        }
        id
    }

    fn add_epsilon(&mut self, from: StateID, to: StateID) -> TransitionID {
        self.add_transition(from, to, None, None)
    }

    pub fn set_start(&mut self, start: StateID) {
        self.start = Some(start);
    }

    pub fn set_accepting(&mut self, id: StateID, tag: Tag) {
        let state = &mut self.states[id.index()];
        state.accepting = true;
        state.tag = Some(tag);
    }

    pub(crate) fn set_accepting_untagged(&mut self, id: StateID) {
        self.states[id.index()].accepting = true;
    }

    pub fn start(&self) -> Option<StateID> {
        self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[id.index()]
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (StateID::new(i), state))
    }

    pub fn transition(&self, id: TransitionID) -> &Transition {
        &self.transitions[id.index()]
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> + '_ {
        self.transitions.iter()
    }

    /// Iterate over the outgoing edges of a state in insertion order.
    pub fn edges(&self, id: StateID) -> impl Iterator<Item = &Transition> + '_ {
        self.states[id.index()]
            .transitions
            .iter()
            .map(move |t| &self.transitions[t.index()])
    }

    pub fn alphabet(&self) -> &Set<CharRange> {
        &self.alphabet
    }

    /// Expand the alphabet into the set of distinct bytes it covers.
    pub fn alphabet_bytes(&self) -> Vec<u8> {
        let mut bytes = BitSet::with_capacity(256);
        for range in &self.alphabet {
            for b in range.bytes() {
                bytes.insert(usize::from(b));
            }
        }
        bytes.iter().filter_map(|b| u8::try_from(b).ok()).collect()
    }

    /// Whether the automaton has no epsilon edge and at most one edge
    /// per byte out of each state.
    pub fn is_deterministic(&self) -> bool {
        self.states().all(|(id, _)| {
            let mut seen = BitSet::with_capacity(256);
            for edge in self.edges(id) {
                let Some(range) = edge.input else {
                    return false;
                };
                for b in range.bytes() {
                    if !seen.insert(usize::from(b)) {
                        return false;
                    }
                }
            }
            true
        })
    }

    /// Follow the edge labeled by `b` out of a state of a deterministic
    /// automaton.
    pub fn step(&self, from: StateID, b: u8) -> Option<StateID> {
        self.edges(from).find(|t| t.accepts(b)).map(|t| t.to)
    }

    /// Run the whole input and report the tag of the accepting state reached,
    /// or `None` if the input is rejected.
    ///
    /// Works on nondeterministic automata as well, in which case the lowest
    /// tag among the reached accepting states is returned.
    pub fn recognize(&self, input: &[u8]) -> Option<Option<Tag>> {
        let start = self.start?;
        let mut current = BitSet::with_capacity(self.states.len());
        current.insert(start.index());
        subset::epsilon_closure(self, &mut current);

        for &b in input {
            current = subset::move_on(self, &current, b);
            subset::epsilon_closure(self, &mut current);
            if current.is_empty() {
                return None;
            }
        }

        let mut accepting = current
            .iter()
            .map(|i| &self.states[i])
            .filter(|state| state.accepting)
            .peekable();
        accepting.peek()?;
        Some(accepting.filter_map(|state| state.tag).min())
    }

    pub fn accepts(&self, input: &[u8]) -> bool {
        self.recognize(input).is_some()
    }

    pub fn display<'a, F>(&'a self, tag_name: F) -> impl fmt::Display + 'a
    where
        F: Fn(Tag) -> Option<&'a str> + 'a,
    {
        display_fn(move |f| {
            match self.start {
                Some(start) => writeln!(f, "start: #{}", start)?,
                None => writeln!(f, "start: (none)")?,
            }
            for (id, state) in self.states() {
                write!(f, "#{}", id)?;
                if state.accepting {
                    match state.tag {
                        Some(tag) => match tag_name(tag) {
                            Some(name) => write!(f, " accept({})", name)?,
                            None => write!(f, " accept(@{})", tag)?,
                        },
                        None => f.write_str(" accept")?,
                    }
                }
                writeln!(f)?;
                for edge in self.edges(id) {
                    match edge.input {
                        Some(range) => writeln!(f, "  [{}] -> #{}", range, edge.to)?,
                        None => writeln!(f, "  (eps) -> #{}", edge.to)?,
                    }
                }
            }
            Ok(())
        })
    }
}
