//! Maximal-munch scanner driven by the lexical automaton.

use crate::{
    automaton::Automaton,
    lexicon::{Lexicon, LexiconError},
    types::Set,
};
use std::fmt;

/// A lexeme recognized by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub class: String,
    pub content: String,
    /// 1-based line of the first byte.
    pub line: usize,
    /// 1-based column of the first byte, counted in bytes.
    pub column: usize,
}

impl tinyfront_runtime::Token for Token {
    fn class(&self) -> &str {
        &self.class
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.content, self.class)
    }
}

/// A character at which no lexical rule matches.
///
/// A multibyte character is reported once and skipped as a whole. If the
/// failure lands inside a character, that single byte is reported as
/// `U+FFFD` instead.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected character {:?} at line: {}, column: {}", character, line, column)]
pub struct LexicalError {
    pub character: char,
    /// Number of source bytes skipped.
    pub len: usize,
    pub line: usize,
    /// 1-based column counted in bytes, like [`Token::column`].
    pub column: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    skip: Set<String>,
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the tokens of the specified class instead of emitting them.
    pub fn skip(&mut self, class: impl Into<String>) -> &mut Self {
        self.skip.insert(class.into());
        self
    }

    pub fn is_skipped(&self, class: &str) -> bool {
        self.skip.contains(class)
    }
}

#[derive(Debug, Default)]
pub struct ScanOutput {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexicalError>,
}

#[derive(Debug)]
pub struct Scanner {
    dfa: Automaton,
    classes: Vec<String>,
    skipped: Vec<bool>,
    build_errors: Vec<LexiconError>,
}

impl Scanner {
    pub fn new(lexicon: &Lexicon, config: &ScanConfig) -> Self {
        let (dfa, build_errors) = lexicon.build_automaton();
        let classes: Vec<String> = lexicon
            .rules()
            .iter()
            .map(|rule| rule.name().to_owned())
            .collect();
        let skipped = classes.iter().map(|c| config.is_skipped(c)).collect();
        for class in &config.skip {
            if !classes.contains(class) {
                tracing::warn!("skipped class `{}' is not defined by any rule", class);
            }
        }
        Self {
            dfa,
            classes,
            skipped,
            build_errors,
        }
    }

    pub fn automaton(&self) -> &Automaton {
        &self.dfa
    }

    /// Rules dropped while compiling the lexicon.
    pub fn build_errors(&self) -> &[LexiconError] {
        &self.build_errors
    }

    /// Split `source` into tokens, always taking the longest match and
    /// breaking ties in favor of the earliest declared rule.
    pub fn scan(&self, source: &str) -> ScanOutput {
        let span = tracing::trace_span!("scan");
        let _entered = span.enter();

        let bytes = source.as_bytes();
        let mut output = ScanOutput::default();
        let mut cursor = Cursor { line: 1, column: 1 };
        let mut pos = 0;

        while pos < bytes.len() {
            match self.longest_match(&bytes[pos..]) {
                Some((len, tag)) => {
                    let end = pos + len;
                    if !self.skipped[tag] {
                        let token = Token {
                            class: self.classes[tag].clone(),
                            content: String::from_utf8_lossy(&bytes[pos..end]).into_owned(),
                            line: cursor.line,
                            column: cursor.column,
                        };
                        tracing::trace!("token {}", token);
                        output.tokens.push(token);
                    }
                    cursor.advance(&bytes[pos..end]);
                    pos = end;
                }
                None => {
                    let (character, len) = match source.get(pos..).and_then(|s| s.chars().next()) {
                        Some(c) => (c, c.len_utf8()),
                        None => (char::REPLACEMENT_CHARACTER, 1),
                    };
                    let err = LexicalError {
                        character,
                        len,
                        line: cursor.line,
                        column: cursor.column,
                    };
                    tracing::debug!("{}", err);
                    output.errors.push(err);
                    cursor.advance(&bytes[pos..pos + len]);
                    pos += len;
                }
            }
        }

        tracing::debug!(
            "scanned {} token(s), {} error(s)",
            output.tokens.len(),
            output.errors.len()
        );
        output
    }

    /// The length and rule index of the longest non-empty match at the head
    /// of `input`.
    fn longest_match(&self, input: &[u8]) -> Option<(usize, usize)> {
        let mut state = self.dfa.start()?;
        let mut last = None;
        for (i, &b) in input.iter().enumerate() {
            match self.dfa.step(state, b) {
                Some(next) => state = next,
                None => break,
            }
            if let Some(tag) = self.dfa.state(state).tag() {
                last = Some((i + 1, tag.index()));
            }
        }
        last
    }
}

#[derive(Debug, Copy, Clone)]
struct Cursor {
    line: usize,
    column: usize,
}

impl Cursor {
    fn advance(&mut self, consumed: &[u8]) {
        for &b in consumed {
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner(skip: &[&str]) -> Scanner {
        let lexicon = Lexicon::define(|def| {
            def.reserved("LET", "let")?;
            def.symbol("PLUS", "+")?;
            def.symbol("EQ", "=")?;
            def.symbol("EQEQ", "==")?;
            def.structure("NUM", "[0-9]+")?;
            def.structure("ID", "[a-z]+")?;
            def.structure("WS", "[ \\t\\n]+")?;
            Ok(())
        })
        .unwrap();
        let mut config = ScanConfig::new();
        for class in skip {
            config.skip(*class);
        }
        Scanner::new(&lexicon, &config)
    }

    fn classes(output: &ScanOutput) -> Vec<(&str, &str)> {
        output
            .tokens
            .iter()
            .map(|t| (t.class.as_str(), t.content.as_str()))
            .collect()
    }

    #[test]
    fn number_plus_number() {
        let output = scanner(&["WS"]).scan("12+3");
        assert!(output.errors.is_empty());
        assert_eq!(
            classes(&output),
            [("NUM", "12"), ("PLUS", "+"), ("NUM", "3")]
        );
    }

    #[test]
    fn longest_match_then_declaration_order() {
        let output = scanner(&["WS"]).scan("let letter == =");
        assert_eq!(
            classes(&output),
            [("LET", "let"), ("ID", "letter"), ("EQEQ", "=="), ("EQ", "=")]
        );
    }

    #[test]
    fn whitespace_is_kept_unless_skipped() {
        let output = scanner(&[]).scan("a b");
        assert_eq!(classes(&output), [("ID", "a"), ("WS", " "), ("ID", "b")]);
    }

    #[test]
    fn positions_and_errors() {
        let output = scanner(&["WS"]).scan("x = 1\n  y $= 22");
        let positions: Vec<_> = output.tokens.iter().map(|t| (t.line, t.column)).collect();
        assert_eq!(positions, [(1, 1), (1, 3), (1, 5), (2, 3), (2, 6), (2, 8)]);
        assert_eq!(
            output.errors,
            [LexicalError {
                character: '$',
                len: 1,
                line: 2,
                column: 5
            }]
        );
    }

    #[test]
    fn multibyte_character_is_one_error() {
        let output = scanner(&["WS"]).scan("1 \u{e9}\u{1f600} 22");
        assert_eq!(classes(&output), [("NUM", "1"), ("NUM", "22")]);
        assert_eq!(
            output.errors,
            [
                LexicalError {
                    character: '\u{e9}',
                    len: 2,
                    line: 1,
                    column: 3
                },
                LexicalError {
                    character: '\u{1f600}',
                    len: 4,
                    line: 1,
                    column: 5
                },
            ]
        );
        // columns count bytes
        assert_eq!(output.tokens[1].column, 10);
    }

    #[test]
    fn failure_inside_a_character_skips_one_byte() {
        // the class holds the bytes of `\u{c3}' (c3 83), so only the lead
        // byte of `\u{e9}' (c3 a9) can be matched
        let lexicon = Lexicon::define(|def| {
            def.structure("LEAD", "[\u{c3}]")?;
            def.structure("NUM", "[0-9]+")?;
            Ok(())
        })
        .unwrap();
        let output = Scanner::new(&lexicon, &ScanConfig::new()).scan("\u{e9}1");
        assert_eq!(output.tokens.len(), 2);
        assert_eq!(output.tokens[0].class, "LEAD");
        assert_eq!((output.tokens[1].class.as_str(), output.tokens[1].column), ("NUM", 3));
        assert_eq!(
            output.errors,
            [LexicalError {
                character: char::REPLACEMENT_CHARACTER,
                len: 1,
                line: 1,
                column: 2
            }]
        );
    }
}
