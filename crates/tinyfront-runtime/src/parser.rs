//! Parser.

use crate::{
    definition::{ParseAction, ParseTable, Token},
    tree::ParseNode,
};
use std::fmt;

/// The shift-reduce parser driven based on the generated parse table.
///
/// The driver keeps three synchronized stacks: automaton states, matched
/// symbols and parse tree nodes. A lookahead without a table entry is
/// discarded and recorded, and parsing continues with the next token.
pub struct Parser<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token,
{
    definition: TDef,
    state_stack: Vec<TDef::State>,
    item_stack: Vec<ParseItem<TDef::Terminal, TDef::Nonterminal>>,
    node_stack: Vec<ParseNode<TTok, TDef::Nonterminal>>,
}

impl<TDef, TTok> fmt::Debug for Parser<TDef, TTok>
where
    TDef: ParseTable + fmt::Debug,
    TDef::State: fmt::Debug,
    TDef::Terminal: fmt::Debug,
    TDef::Nonterminal: fmt::Debug,
    TTok: Token + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("definition", &self.definition)
            .field("state_stack", &self.state_stack)
            .field("item_stack", &self.item_stack)
            .field("node_stack", &self.node_stack)
            .finish()
    }
}

impl<TDef, TTok> Parser<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token,
{
    /// Create an instance of `Parser` using the specified parse table.
    pub fn new(definition: TDef) -> Self {
        Self {
            definition,
            state_stack: vec![],
            item_stack: vec![],
            node_stack: vec![],
        }
    }

    pub fn definition(&self) -> &TDef {
        &self.definition
    }

    /// Drive the automaton over the whole token stream.
    ///
    /// The end of input is offered to the table once the stream is exhausted,
    /// so a complete sentence is reduced up to the start symbol and accepted.
    pub fn parse<I>(
        &mut self,
        tokens: I,
    ) -> Result<ParseOutput<TTok, TDef::Nonterminal>, ParseError>
    where
        I: IntoIterator<Item = TTok>,
    {
        let span = tracing::trace_span!("parse");
        let _entered = span.enter();

        self.state_stack.clear();
        self.item_stack.clear();
        self.node_stack.clear();
        self.state_stack.push(self.definition.initial_state());

        let mut errors = vec![];
        let mut tokens = tokens.into_iter();
        let mut lookahead = tokens.next();

        let outcome = loop {
            let current = *self
                .state_stack
                .last()
                .ok_or_else(|| ParseError::EmptyStateStack)?;

            let terminal = match &lookahead {
                Some(token) => match self.definition.terminal(token.class()) {
                    Some(t) => Some(t),
                    None => {
                        tracing::debug!("unknown token class `{}', skipped", token.class());
                        errors.extend(lookahead.take().map(|token| SkippedToken { token }));
                        lookahead = tokens.next();
                        continue;
                    }
                },
                None => None,
            };

            match self.definition.action(current, terminal) {
                Some(ParseAction::Shift(next)) => {
                    let token = lookahead.take().ok_or_else(|| ParseError::UnexpectedEOI)?;
                    tracing::trace!("shift `{}'", token.class());
                    if let Some(t) = terminal {
                        self.item_stack.push(ParseItem::T(t));
                    }
                    self.state_stack.push(next);
                    self.node_stack.push(ParseNode::Leaf(token));
                    lookahead = tokens.next();
                }

                Some(ParseAction::Reduce { rule: _, lhs, n }) => {
                    if n >= self.state_stack.len() || n > self.node_stack.len() {
                        return Err(ParseError::EmptyItemStack);
                    }
                    self.state_stack.truncate(self.state_stack.len() - n);
                    self.item_stack.truncate(self.item_stack.len().saturating_sub(n));
                    let children = self.node_stack.split_off(self.node_stack.len() - n);

                    let top = *self
                        .state_stack
                        .last()
                        .ok_or_else(|| ParseError::EmptyStateStack)?;
                    let next = self
                        .definition
                        .goto(top, lhs)
                        .ok_or_else(|| ParseError::MissingGoto)?;
                    tracing::trace!("reduce {} item(s)", n);

                    self.state_stack.push(next);
                    self.item_stack.push(ParseItem::N(lhs));
                    self.node_stack.push(ParseNode::Branch {
                        symbol: lhs,
                        children,
                    });
                }

                Some(ParseAction::Accept) => {
                    let root = self
                        .node_stack
                        .pop()
                        .ok_or_else(|| ParseError::EmptyNodeStack)?;
                    break Outcome::Accepted(root);
                }

                None => match lookahead.take() {
                    Some(token) => {
                        tracing::debug!("no action for `{}', skipped", token.class());
                        errors.push(SkippedToken { token });
                        lookahead = tokens.next();
                    }
                    None => {
                        tracing::debug!("reached the end of input without accepting");
                        break Outcome::Incomplete(self.node_stack.pop());
                    }
                },
            }
        };

        Ok(ParseOutput { outcome, errors })
    }
}

/// A matched symbol kept on the symbol stack.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ParseItem<TTerm, TSym> {
    T(TTerm),
    N(TSym),
}

/// A lookahead token discarded because the table had no entry for it.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedToken<TTok> {
    pub token: TTok,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<TTok, TSym> {
    /// The start symbol was reduced at the end of input.
    Accepted(ParseNode<TTok, TSym>),

    /// The input ran out before the table accepted it.
    ///
    /// Holds the node left on the top of the tree stack, if any.
    Incomplete(Option<ParseNode<TTok, TSym>>),
}

/// The result of a single `Parser::parse` run.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput<TTok, TSym> {
    pub outcome: Outcome<TTok, TSym>,
    pub errors: Vec<SkippedToken<TTok>>,
}

impl<TTok, TSym> ParseOutput<TTok, TSym> {
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, Outcome::Accepted(..))
    }

    /// Accepted with no skipped token.
    pub fn is_clean(&self) -> bool {
        self.is_accepted() && self.errors.is_empty()
    }

    /// Return the accepted tree, or the partial one.
    pub fn tree(&self) -> Option<&ParseNode<TTok, TSym>> {
        match &self.outcome {
            Outcome::Accepted(tree) => Some(tree),
            Outcome::Incomplete(tree) => tree.as_ref(),
        }
    }

    pub fn into_tree(self) -> Option<ParseNode<TTok, TSym>> {
        match self.outcome {
            Outcome::Accepted(tree) => Some(tree),
            Outcome::Incomplete(tree) => tree,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected EOI")]
    UnexpectedEOI,

    #[error("missing goto edge after reduction")]
    MissingGoto,

    #[error("empty state stack")]
    EmptyStateStack,

    #[error("empty item stack")]
    EmptyItemStack,

    #[error("empty node stack")]
    EmptyNodeStack,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hand-written table for:
    //   $start -> E
    //   E -> E PLUS num | num
    #[derive(Debug)]
    struct Table;

    #[derive(Debug, Copy, Clone, PartialEq)]
    enum T {
        Num,
        Plus,
    }

    impl ParseTable for Table {
        type State = u8;
        type Terminal = T;
        type Nonterminal = &'static str;
        type Rule = u8;

        fn initial_state(&self) -> u8 {
            0
        }

        fn terminal(&self, class: &str) -> Option<T> {
            match class {
                "NUM" => Some(T::Num),
                "PLUS" => Some(T::Plus),
                _ => None,
            }
        }

        fn action(&self, current: u8, lookahead: Option<T>) -> Option<ParseAction<u8, &'static str, u8>> {
            use ParseAction::*;
            match (current, lookahead) {
                (0, Some(T::Num)) => Some(Shift(2)),
                (1, Some(T::Plus)) => Some(Shift(3)),
                (1, None) => Some(Accept),
                (2, Some(T::Plus) | None) => Some(Reduce { rule: 2, lhs: "E", n: 1 }),
                (3, Some(T::Num)) => Some(Shift(4)),
                (4, Some(T::Plus) | None) => Some(Reduce { rule: 1, lhs: "E", n: 3 }),
                _ => None,
            }
        }

        fn goto(&self, current: u8, symbol: &'static str) -> Option<u8> {
            match (current, symbol) {
                (0, "E") => Some(1),
                _ => None,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Tok(&'static str, &'static str);
    impl Token for Tok {
        fn class(&self) -> &str {
            self.0
        }
    }

    fn tokens(classes: &[&'static str]) -> Vec<Tok> {
        classes.iter().map(|c| Tok(c, c)).collect()
    }

    #[test]
    fn accepts_valid_sentence() {
        let mut parser = Parser::new(Table);
        let output = parser.parse(tokens(&["NUM", "PLUS", "NUM"])).unwrap();
        assert!(output.is_clean());

        let tree = output.tree().unwrap();
        assert_eq!(tree.symbol(), Some(&"E"));
        assert_eq!(tree.children().len(), 3);
        let leaves: Vec<_> = tree.leaves().map(|t| t.0).collect();
        assert_eq!(leaves, ["NUM", "PLUS", "NUM"]);
    }

    #[test]
    fn skips_tokens_without_action() {
        let mut parser = Parser::new(Table);
        let output = parser
            .parse(tokens(&["NUM", "PLUS", "PLUS", "NUM", "BOGUS"]))
            .unwrap();
        assert!(output.is_accepted());
        let skipped: Vec<_> = output.errors.iter().map(|e| e.token.0).collect();
        assert_eq!(skipped, ["PLUS", "BOGUS"]);
    }

    #[test]
    fn truncated_input_is_incomplete() {
        let mut parser = Parser::new(Table);
        let output = parser.parse(tokens(&["NUM", "PLUS"])).unwrap();
        assert!(!output.is_accepted());
        assert!(matches!(
            output.outcome,
            Outcome::Incomplete(Some(ParseNode::Leaf(Tok("PLUS", _))))
        ));

        let output = parser.parse(Vec::<Tok>::new()).unwrap();
        assert!(matches!(output.outcome, Outcome::Incomplete(None)));
    }

    #[test]
    fn borrowed_table_drives_parser() {
        let table = Table;
        let mut parser = Parser::new(&table);
        let output = parser.parse(tokens(&["NUM", "PLUS", "NUM"])).unwrap();
        assert!(output.is_clean());
        assert_eq!(output.tree().unwrap().symbol(), Some(&"E"));
    }
}
