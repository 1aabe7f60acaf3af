//! Calculation of first set function.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID},
    types::{Map, Set},
};

#[derive(Debug)]
pub struct FirstSets {
    nulls: Set<NonterminalID>,
    map: Map<SymbolID, Set<TerminalID>>,
}

impl FirstSets {
    pub fn new(grammar: &Grammar) -> Self {
        let nulls = nulls_set(grammar);

        // First(t) = {t}, First(N) = {} to begin with
        let mut map: Map<SymbolID, Set<TerminalID>> = Map::default();
        for terminal in grammar.terminals.values() {
            map.insert(
                SymbolID::T(terminal.id()),
                Some(terminal.id()).into_iter().collect(),
            );
        }
        for symbol in grammar.nonterminals.values() {
            map.insert(SymbolID::N(symbol.id()), Set::default());
        }

        // For X -> Y1 Y2 ... Yn, First(X) includes First(Yi) for every Yi up
        // to and including the first non-nullable one.
        let mut changed = true;
        while changed {
            changed = false;
            for rule in grammar.rules.values() {
                let left = SymbolID::N(rule.left());
                for symbol in rule.right() {
                    if *symbol != left {
                        let added: Vec<TerminalID> = map[symbol].iter().copied().collect();
                        let superset = &mut map[&left];
                        for t in added {
                            changed |= superset.insert(t);
                        }
                    }
                    if !matches!(symbol, SymbolID::N(n) if nulls.contains(n)) {
                        break;
                    }
                }
            }
        }

        Self { nulls, map }
    }

    pub fn is_nullable(&self, symbol: NonterminalID) -> bool {
        self.nulls.contains(&symbol)
    }

    pub fn first(&self, symbol: SymbolID) -> &Set<TerminalID> {
        &self.map[&symbol]
    }

    /// `First(prefix lookaheads)`
    pub fn get<L>(&self, prefix: &[SymbolID], lookaheads: L) -> Set<TerminalID>
    where
        L: IntoIterator<Item = TerminalID>,
    {
        let mut res = Set::default();

        let mut is_end = false;
        for symbol in prefix {
            res.extend(self.map[symbol].iter().copied());
            if !matches!(symbol, SymbolID::N(n) if self.nulls.contains(n)) {
                is_end = true;
                break;
            }
        }

        if !is_end {
            res.extend(lookaheads);
        }

        res
    }
}

/// Calculate the set of nullable symbols in this grammar.
fn nulls_set(grammar: &Grammar) -> Set<NonterminalID> {
    let mut nulls: Set<NonterminalID> = grammar
        .rules
        .values()
        .filter_map(|rule| rule.right().is_empty().then(|| rule.left()))
        .collect();

    // repeat until no symbol is added
    let mut changed = true;
    while changed {
        changed = false;
        for rule in grammar.rules.values() {
            if nulls.contains(&rule.left()) {
                continue;
            }
            let is_rhs_nullable = rule
                .right()
                .iter()
                .all(|symbol| matches!(symbol, SymbolID::N(n) if nulls.contains(n)));
            if is_rhs_nullable {
                changed = true;
                nulls.insert(rule.left());
            }
        }
    }

    nulls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    #[test]
    fn nullable_prefixes() {
        let mut ids = None;
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a", None)?;
            let b = g.terminal("b", None)?;
            let s = g.nonterminal("S")?;
            let x = g.nonterminal("A")?;
            let y = g.nonterminal("B")?;
            g.rule(s, [N(x), N(y)], None)?;
            g.rule(x, [], None)?;
            g.rule(x, [T(a)], None)?;
            g.rule(y, [T(b)], None)?;
            ids = Some((a, b, s, x, y));
            Ok(())
        })
        .unwrap();
        let (a, b, s, x, y) = ids.unwrap();

        let first_sets = FirstSets::new(&grammar);
        assert!(first_sets.is_nullable(x));
        assert!(!first_sets.is_nullable(s));
        assert!(!first_sets.is_nullable(y));

        let first_s: Vec<_> = first_sets.first(N(s)).iter().copied().collect();
        assert_eq!(first_s, [a, b]);

        let first = first_sets.get(&[N(x)], Some(TerminalID::EOI));
        assert!(first.contains(&a));
        assert!(first.contains(&TerminalID::EOI));
        assert!(!first.contains(&b));
    }

    #[test]
    fn left_recursion() {
        let grammar = Grammar::from_str(
            "%token PLUS NUM LP RP\nE -> E PLUS T | T\nT -> NUM | LP E RP",
        )
        .unwrap();
        let first_sets = FirstSets::new(&grammar);
        let e = grammar.nonterminal_by_name("E").unwrap();
        let mut first: Vec<_> = first_sets.first(N(e)).iter().copied().collect();
        first.sort();
        let mut expected = vec![
            grammar.terminal_by_name("NUM").unwrap(),
            grammar.terminal_by_name("LP").unwrap(),
        ];
        expected.sort();
        assert_eq!(first, expected);
    }
}
