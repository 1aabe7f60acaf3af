//! Parser definition.

/// A trait for abstracting the tokens fed into the parser.
pub trait Token {
    /// Return the name of the lexical class this token belongs to.
    fn class(&self) -> &str;
}

/// The trait for abstracting the generated LR(1) parse table.
pub trait ParseTable {
    /// The number to identify the state of LR(1) automaton.
    type State: Copy;

    /// The number to identify the terminal symbols.
    type Terminal: Copy;

    /// The number to identify the nonterminal symbols.
    type Nonterminal: Copy;

    /// The value identifying the production rule used by a reduction.
    type Rule: Copy;

    /// Return the initial state number.
    fn initial_state(&self) -> Self::State;

    /// Resolve the terminal symbol corresponding to a lexical class.
    ///
    /// A `None` means the class is unknown to the grammar.
    fn terminal(&self, class: &str) -> Option<Self::Terminal>;

    /// Return the action corresponding to the specified state number and
    /// lookahead symbol, or `None` if the table has no entry.
    ///
    /// If there is no lookahead symbol, a `None` is passed as the end of input.
    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> Option<ParseAction<Self::State, Self::Nonterminal, Self::Rule>>;

    /// Return the destination of the goto edge labeled by `symbol`.
    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State>;
}

impl<T: ?Sized> ParseTable for &T
where
    T: ParseTable,
{
    type State = T::State;
    type Terminal = T::Terminal;
    type Nonterminal = T::Nonterminal;
    type Rule = T::Rule;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn terminal(&self, class: &str) -> Option<Self::Terminal> {
        (**self).terminal(class)
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> Option<ParseAction<Self::State, Self::Nonterminal, Self::Rule>> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
        (**self).goto(current, symbol)
    }
}

/// The action taken by the driver for a particular state and lookahead.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseAction<TState, TNonterminal, TRule> {
    /// Consume the lookahead and move to the specified state.
    Shift(TState),

    /// Collapse the last `n` stack entries into `lhs`.
    Reduce {
        rule: TRule,
        lhs: TNonterminal,
        n: usize,
    },

    Accept,
}
