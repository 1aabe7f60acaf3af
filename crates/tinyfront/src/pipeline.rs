//! The scanner and the parser wired together.

use crate::{
    grammar::{Grammar, NonterminalID, TerminalID},
    lexicon::{Lexicon, LexiconError},
    lr1::{self, LR1Automaton},
    parser::{ParseDefinition, Tree},
    scan::{LexicalError, ScanConfig, Scanner, Token},
    table::{ParseTable, TableError},
};
use tinyfront_runtime::{Outcome, ParseError, Parser, SkippedToken};

#[derive(Debug, Default, Clone)]
pub struct FrontendConfig {
    pub lr1: lr1::Config,
    pub scan: ScanConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    #[error("failed to build the parse table")]
    Table(#[from] TableError),

    #[error("parser stack is broken")]
    Parse(#[from] ParseError),
}

/// The result of running a source text through the front end.
#[derive(Debug)]
pub struct Parsed {
    pub tokens: Vec<Token>,
    pub lexical_errors: Vec<LexicalError>,
    pub skipped: Vec<SkippedToken<Token>>,
    pub outcome: Outcome<Token, NonterminalID>,
}

impl Parsed {
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, Outcome::Accepted(..))
    }

    /// Accepted without lexical errors or skipped tokens.
    pub fn is_clean(&self) -> bool {
        self.is_accepted() && self.lexical_errors.is_empty() && self.skipped.is_empty()
    }

    pub fn tree(&self) -> Option<&Tree> {
        match &self.outcome {
            Outcome::Accepted(tree) => Some(tree),
            Outcome::Incomplete(tree) => tree.as_ref(),
        }
    }
}

/// A lexical automaton and a parse table, built once and reused for any
/// number of sources.
#[derive(Debug)]
pub struct Frontend {
    grammar: Grammar,
    scanner: Scanner,
    automaton: LR1Automaton,
    definition: ParseDefinition,
    unlexed: Vec<String>,
}

impl Frontend {
    pub fn new(
        lexicon: &Lexicon,
        grammar: Grammar,
        config: &FrontendConfig,
    ) -> Result<Self, FrontendError> {
        let span = tracing::trace_span!("frontend");
        let _entered = span.enter();

        let scanner = Scanner::new(lexicon, &config.scan);

        let mut unlexed = vec![];
        for terminal in grammar.terminals.values() {
            if terminal.id() == TerminalID::EOI {
                continue;
            }
            let Some(name) = terminal.export_name() else {
                continue;
            };
            if !lexicon.rules().iter().any(|rule| rule.name() == name) {
                tracing::warn!("terminal `{}' has no lexical rule", name);
                unlexed.push(name.to_owned());
            }
        }

        let automaton = LR1Automaton::generate_with_config(&grammar, &config.lr1);
        let table = ParseTable::from_automaton(&grammar, &automaton)?;
        let definition = ParseDefinition::new(&grammar, table);

        Ok(Self {
            grammar,
            scanner,
            automaton,
            definition,
            unlexed,
        })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub fn automaton(&self) -> &LR1Automaton {
        &self.automaton
    }

    pub fn table(&self) -> &ParseTable {
        self.definition.table()
    }

    /// Rules dropped while building the lexical automaton.
    pub fn lexicon_errors(&self) -> &[LexiconError] {
        self.scanner.build_errors()
    }

    /// Grammar terminals that no lexical rule produces.
    pub fn unlexed_terminals(&self) -> &[String] {
        &self.unlexed
    }

    pub fn parse(&self, source: &str) -> Result<Parsed, FrontendError> {
        let scanned = self.scanner.scan(source);
        let tokens = scanned.tokens;

        let mut parser = Parser::new(&self.definition);
        let output = parser.parse(tokens.iter().cloned())?;

        Ok(Parsed {
            tokens,
            lexical_errors: scanned.errors,
            skipped: output.errors,
            outcome: output.outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc() -> Frontend {
        let lexicon = Lexicon::define(|def| {
            def.symbol("PLUS", "+")?;
            def.structure("NUM", "[0-9]+")?;
            def.structure("WS", "[ \\t]+")?;
            Ok(())
        })
        .unwrap();
        let grammar = Grammar::from_str("%token NUM PLUS\nE -> E PLUS E | NUM").unwrap();
        let mut config = FrontendConfig::default();
        config.scan.skip("WS");
        Frontend::new(&lexicon, grammar, &config).unwrap()
    }

    #[test]
    fn number_plus_number() {
        let frontend = calc();
        let parsed = frontend.parse("12+3").unwrap();
        assert!(parsed.is_clean());

        let tree = parsed.tree().unwrap();
        let e = frontend.grammar().nonterminal_by_name("E").unwrap();
        assert_eq!(tree.symbol(), Some(&e));
        let leaves: Vec<_> = tree.leaves().map(|t| t.content.as_str()).collect();
        assert_eq!(leaves, ["12", "+", "3"]);
    }

    #[test]
    fn errors_are_collected() {
        let frontend = calc();
        let parsed = frontend.parse("1 + $ 2 3").unwrap();
        assert_eq!(parsed.lexical_errors.len(), 1);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].token.content, "3");
        assert!(parsed.is_accepted());
        assert!(!parsed.is_clean());
    }

    #[test]
    fn incomplete_lexicon_still_builds() {
        let lexicon = Lexicon::define(|def| {
            def.symbol("PLUS", "+")?;
            def.structure("BAD", "[0-9")?;
            def.structure("NUM", "[0-9]+")?;
            Ok(())
        })
        .unwrap();
        let grammar =
            Grammar::from_str("%token NUM PLUS MINUS\nE -> E PLUS NUM | E MINUS NUM | NUM")
                .unwrap();
        let frontend = Frontend::new(&lexicon, grammar, &FrontendConfig::default()).unwrap();

        assert_eq!(frontend.unlexed_terminals(), ["MINUS"]);
        let errors = frontend.lexicon_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            LexiconError::Regex { rule, .. } if rule == "BAD"
        ));

        let parsed = frontend.parse("1+2").unwrap();
        assert!(parsed.is_clean());
        let classes: Vec<_> = parsed.tokens.iter().map(|t| t.class.as_str()).collect();
        assert_eq!(classes, ["NUM", "PLUS", "NUM"]);
    }

    #[test]
    fn complete_lexicon_has_no_unlexed_terminals() {
        let frontend = calc();
        assert!(frontend.unlexed_terminals().is_empty());
        assert!(frontend.lexicon_errors().is_empty());
    }
}
