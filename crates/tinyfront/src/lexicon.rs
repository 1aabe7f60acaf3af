//! Lexical rule definitions.

use crate::{
    automaton::{Automaton, Tag},
    minimize::minimize,
    regex::{self, RegexError},
    subset::determinize,
    types::Map,
    util::verify_ident,
};
use std::{fmt, fs, io, path::Path};

/// How the pattern of a lexical rule is interpreted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Reserved words. The pattern is used as written.
    Reserved,
    /// Punctuation. Every metacharacter is escaped, so the pattern matches
    /// itself literally.
    Symbol,
    /// Full regular expressions which may reference other rules.
    Structure,
}

impl RuleKind {
    fn from_title(title: &str) -> Option<Self> {
        match title {
            "[reserve]" => Some(Self::Reserved),
            "[sign]" => Some(Self::Symbol),
            "[structure]" => Some(Self::Structure),
            _ => None,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved => f.write_str("reserve"),
            Self::Symbol => f.write_str("sign"),
            Self::Structure => f.write_str("structure"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LexRule {
    name: String,
    pattern: String,
    kind: RuleKind,
    line: Option<usize>,
    usable: bool,
}

impl LexRule {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pattern after escaping and reference substitution.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// The line of the definition file this rule was read from.
    pub fn line(&self) -> Option<usize> {
        self.line
    }

    /// Whether the rule survived reference resolution.
    pub fn is_usable(&self) -> bool {
        self.usable
    }
}

/// An ordered set of lexical rules.
///
/// The position of a rule is the [`Tag`] attached to the accepting states it
/// produces, so earlier rules take priority on overlapping matches.
#[derive(Debug)]
pub struct Lexicon {
    rules: Vec<LexRule>,
    errors: Vec<LexiconError>,
}

impl fmt::Display for Lexicon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rule) in self.rules.iter().enumerate() {
            write!(f, "@{} {} [{}] {}", i, rule.name, rule.kind, rule.pattern)?;
            if !rule.usable {
                f.write_str(" (unusable)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Lexicon {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LexiconError> {
        let source = fs::read_to_string(path).map_err(LexiconError::IO)?;
        Self::from_str(&source)
    }

    /// Parse the line-oriented rule format.
    ///
    /// Section titles (`[reserve]`, `[sign]`, `[structure]`) select the kind
    /// of the following rules, each written as `NAME PATTERN`. A name
    /// prefixed with `^` declares a rule that may only be referenced.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Result<Self, LexiconError> {
        Self::define(|def| {
            let mut kind = None;
            for (i, line) in source.lines().enumerate() {
                let lineno = i + 1;
                let line = line.trim_end_matches('\r');
                if line.trim().is_empty() {
                    continue;
                }
                if let Some(k) = RuleKind::from_title(line.trim()) {
                    kind = Some(k);
                    continue;
                }

                let kind = kind.ok_or_else(|| LexiconError::Syntax {
                    line: lineno,
                    msg: "rule outside of a section".into(),
                })?;
                let (name, pattern) = match line.split_once(' ') {
                    Some((name, pattern)) => (name, pattern.trim_start()),
                    None => (line, ""),
                };
                if pattern.is_empty() {
                    return Err(LexiconError::Syntax {
                        line: lineno,
                        msg: format!("missing pattern for `{}'", name),
                    });
                }

                match name.strip_prefix('^') {
                    Some(name) => def.add(kind, name, pattern, true, Some(lineno))?,
                    None => def.add(kind, name, pattern, false, Some(lineno))?,
                }
            }
            Ok(())
        })
    }

    /// Define a lexicon using the specified function.
    pub fn define<F>(f: F) -> Result<Self, LexiconError>
    where
        F: FnOnce(&mut LexiconDef) -> Result<(), LexiconError>,
    {
        let mut def = LexiconDef { rules: vec![] };
        f(&mut def)?;
        Ok(def.end())
    }

    pub fn rules(&self) -> &[LexRule] {
        &self.rules
    }

    pub fn rule(&self, tag: Tag) -> Option<&LexRule> {
        self.rules.get(tag.index())
    }

    pub fn class_name(&self, tag: Tag) -> Option<&str> {
        self.rule(tag).map(|rule| rule.name())
    }

    /// Problems found while resolving references.
    ///
    /// The rules concerned are kept but never compiled.
    pub fn errors(&self) -> &[LexiconError] {
        &self.errors
    }

    /// Compile every usable rule and merge them into one deterministic
    /// automaton whose accepting states are tagged by rule position.
    ///
    /// Rules with malformed patterns are left out and reported.
    pub fn build_automaton(&self) -> (Automaton, Vec<LexiconError>) {
        let span = tracing::trace_span!("build_automaton");
        let _entered = span.enter();

        let mut errors = vec![];
        let mut parts = Vec::with_capacity(self.rules.len());
        for (i, rule) in self.rules.iter().enumerate() {
            if !rule.usable {
                continue;
            }
            match compile_rule(&rule.pattern, Tag::new(i)) {
                Ok(dfa) => parts.push(dfa),
                Err(source) => {
                    tracing::warn!("rule `{}' skipped: {}", rule.name, source);
                    errors.push(LexiconError::Regex {
                        rule: rule.name.clone(),
                        source,
                    });
                }
            }
        }

        let merged = Automaton::merge(parts);
        let dfa = determinize(&merged);
        tracing::debug!(
            "lexical automaton: {} rules, {} states",
            self.rules.len(),
            dfa.len()
        );
        (dfa, errors)
    }
}

fn compile_rule(pattern: &str, tag: Tag) -> Result<Automaton, RegexError> {
    let postfix = regex::compile(pattern)?;
    let nfa = Automaton::from_postfix(&postfix, tag)?;
    Ok(minimize(&determinize(&nfa)))
}

#[derive(Debug)]
struct PendingRule {
    name: String,
    pattern: String,
    kind: RuleKind,
    line: Option<usize>,
    reference_only: bool,
}

/// The contextual values for building a `Lexicon`.
#[derive(Debug)]
pub struct LexiconDef {
    rules: Vec<PendingRule>,
}

impl LexiconDef {
    pub fn reserved(&mut self, name: &str, pattern: &str) -> Result<(), LexiconError> {
        self.add(RuleKind::Reserved, name, pattern, false, None)
    }

    pub fn symbol(&mut self, name: &str, pattern: &str) -> Result<(), LexiconError> {
        self.add(RuleKind::Symbol, name, pattern, false, None)
    }

    pub fn structure(&mut self, name: &str, pattern: &str) -> Result<(), LexiconError> {
        self.add(RuleKind::Structure, name, pattern, false, None)
    }

    /// Declare a rule usable only through `` `name` `` references.
    pub fn reference(
        &mut self,
        kind: RuleKind,
        name: &str,
        pattern: &str,
    ) -> Result<(), LexiconError> {
        self.add(kind, name, pattern, true, None)
    }

    fn add(
        &mut self,
        kind: RuleKind,
        name: &str,
        pattern: &str,
        reference_only: bool,
        line: Option<usize>,
    ) -> Result<(), LexiconError> {
        if !verify_ident(name) {
            return Err(LexiconError::InvalidName(name.to_owned()));
        }
        if self.rules.iter().any(|rule| rule.name == name) {
            return Err(LexiconError::DuplicateRule(name.to_owned()));
        }
        self.rules.push(PendingRule {
            name: name.to_owned(),
            pattern: pattern.to_owned(),
            kind,
            line,
            reference_only,
        });
        Ok(())
    }

    fn end(mut self) -> Lexicon {
        for rule in &mut self.rules {
            if rule.kind == RuleKind::Symbol {
                rule.pattern = regex::escape_literal(&rule.pattern);
            }
        }

        let patterns: Map<&str, &str> = self
            .rules
            .iter()
            .map(|rule| (rule.name.as_str(), rule.pattern.as_str()))
            .collect();

        let mut errors = vec![];
        let mut rules = vec![];
        for rule in &self.rules {
            let mut usable = true;
            let mut pattern = rule.pattern.clone();
            if rule.kind == RuleKind::Structure {
                match dereference(&rule.pattern, |name| patterns.get(name).copied()) {
                    Ok(resolved) => pattern = resolved,
                    Err(err) => {
                        let err = err.into_error(&rule.name);
                        tracing::warn!("{}", err);
                        errors.push(err);
                        usable = false;
                    }
                }
            }
            if !rule.reference_only {
                rules.push(LexRule {
                    name: rule.name.clone(),
                    pattern,
                    kind: rule.kind,
                    line: rule.line,
                    usable,
                });
            }
        }

        Lexicon { rules, errors }
    }
}

const MAX_EXPANSIONS: usize = 256;

#[derive(Debug)]
enum RefError {
    Unresolved(String),
    Unterminated,
    TooDeep,
}

impl RefError {
    fn into_error(self, rule: &str) -> LexiconError {
        let rule = rule.to_owned();
        match self {
            Self::Unresolved(name) => LexiconError::UnresolvedReference { rule, name },
            Self::Unterminated => LexiconError::UnterminatedReference { rule },
            Self::TooDeep => LexiconError::RecursiveReference { rule },
        }
    }
}

/// Replace each `` `name` `` by the parenthesized pattern of `name`.
///
/// Substituted text is scanned again, so references may nest.
fn dereference<'a, F>(pattern: &str, lookup: F) -> Result<String, RefError>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut resolved = String::with_capacity(pattern.len());
    let mut rest = pattern.to_owned();
    let mut expansions = 0;
    loop {
        let Some(pos) = find_unescaped(&rest, b'`') else {
            resolved.push_str(&rest);
            return Ok(resolved);
        };
        resolved.push_str(&rest[..pos]);

        let after = &rest[pos + 1..];
        let len = after.find('`').ok_or(RefError::Unterminated)?;
        let name = &after[..len];
        let target = lookup(name).ok_or_else(|| RefError::Unresolved(name.to_owned()))?;

        expansions += 1;
        if expansions > MAX_EXPANSIONS {
            return Err(RefError::TooDeep);
        }
        rest = format!("({}){}", target, &after[len + 1..]);
    }
}

fn find_unescaped(s: &str, needle: u8) -> Option<usize> {
    let mut bytes = s.bytes().enumerate();
    while let Some((i, b)) = bytes.next() {
        if b == b'\\' {
            bytes.next();
        } else if b == needle {
            return Some(i);
        }
    }
    None
}

#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("Syntax error at line {}: {}", line, msg)]
    Syntax { line: usize, msg: String },

    #[error("incorrect rule name `{}'", _0)]
    InvalidName(String),

    #[error("the rule `{}' has already been defined", _0)]
    DuplicateRule(String),

    #[error("rule `{}': reference to unknown rule `{}'", rule, name)]
    UnresolvedReference { rule: String, name: String },

    #[error("rule `{}': unterminated reference", rule)]
    UnterminatedReference { rule: String },

    #[error("rule `{}': references expand without end", rule)]
    RecursiveReference { rule: String },

    #[error("rule `{}': {}", rule, source)]
    Regex {
        rule: String,
        #[source]
        source: RegexError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_matches {
        ($e:expr, $p:pat $(if $guard:expr)?) => {
            match $e {
                $p $(if $guard)? => (),
                e => panic!("assertion failed: `{:?}' does not match `{}'", e, stringify!($p)),
            }
        };
    }

    const CALC: &str = "\
[reserve]
LET let
[sign]
PLUS +
STAR *
[structure]
^digit [0-9]
NUM `digit`+(\\.`digit`+)?
ID [a-z_][a-z_0-9]*
WS [ \\t]+
";

    #[test]
    fn sections_and_escaping() {
        let lexicon = Lexicon::from_str(CALC).unwrap();
        let names: Vec<_> = lexicon.rules().iter().map(|r| r.name()).collect();
        assert_eq!(names, ["LET", "PLUS", "STAR", "NUM", "ID", "WS"]);

        let plus = &lexicon.rules()[1];
        assert_eq!(plus.kind(), RuleKind::Symbol);
        assert_eq!(plus.pattern(), "\\+");
        assert_eq!(plus.line(), Some(4));

        let num = &lexicon.rules()[3];
        assert_eq!(num.pattern(), "([0-9])+(\\.([0-9])+)?");
        assert!(lexicon.errors().is_empty());
    }

    #[test]
    fn nested_references() {
        let lexicon = Lexicon::define(|def| {
            def.reference(RuleKind::Structure, "d", "[0-9]")?;
            def.reference(RuleKind::Structure, "int", "`d`+")?;
            def.structure("REAL", "`int`\\.`int`")?;
            def.structure("TICK", "\\`")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(lexicon.rules().len(), 2);
        assert_eq!(lexicon.rules()[0].pattern(), "(([0-9])+)\\.(([0-9])+)");
        assert_eq!(lexicon.rules()[1].pattern(), "\\`");
    }

    #[test]
    fn broken_references_are_recorded() {
        let lexicon = Lexicon::define(|def| {
            def.structure("A", "x`missing`")?;
            def.structure("B", "y`oops")?;
            def.structure("C", "`C`")?;
            def.structure("D", "d")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(lexicon.errors().len(), 3);
        assert_matches!(
            &lexicon.errors()[0],
            LexiconError::UnresolvedReference { rule, name } if rule == "A" && name == "missing"
        );
        assert_matches!(
            &lexicon.errors()[1],
            LexiconError::UnterminatedReference { rule } if rule == "B"
        );
        assert_matches!(
            &lexicon.errors()[2],
            LexiconError::RecursiveReference { rule } if rule == "C"
        );
        let usable: Vec<_> = lexicon.rules().iter().map(|r| r.is_usable()).collect();
        assert_eq!(usable, [false, false, false, true]);

        let (dfa, errors) = lexicon.build_automaton();
        assert!(errors.is_empty());
        assert_eq!(dfa.recognize(b"d"), Some(Some(Tag::new(3))));
        assert_eq!(dfa.recognize(b"x"), None);
    }

    #[test]
    fn definition_errors() {
        assert_matches!(
            Lexicon::from_str("NUM [0-9]+"),
            Err(LexiconError::Syntax { line: 1, .. })
        );
        assert_matches!(
            Lexicon::from_str("[structure]\n\nNUM"),
            Err(LexiconError::Syntax { line: 3, .. })
        );
        assert_matches!(
            Lexicon::from_str("[sign]\nPLUS +\nPLUS -"),
            Err(LexiconError::DuplicateRule(name)) if name == "PLUS"
        );
        assert_matches!(
            Lexicon::from_str("[sign]\n1X +"),
            Err(LexiconError::InvalidName(..))
        );
    }

    #[test]
    fn automaton_tags_follow_declaration_order() {
        let lexicon = Lexicon::from_str(CALC).unwrap();
        let (dfa, errors) = lexicon.build_automaton();
        assert!(errors.is_empty());
        assert!(dfa.is_deterministic());

        let class = |input: &str| {
            dfa.recognize(input.as_bytes())
                .flatten()
                .and_then(|tag| lexicon.class_name(tag))
        };
        assert_eq!(class("let"), Some("LET"));
        assert_eq!(class("lets"), Some("ID"));
        assert_eq!(class("+"), Some("PLUS"));
        assert_eq!(class("*"), Some("STAR"));
        assert_eq!(class("3.14"), Some("NUM"));
        assert_eq!(class(" \t "), Some("WS"));
        assert_eq!(class("3."), None);
    }

    #[test]
    fn malformed_patterns_are_skipped() {
        let lexicon = Lexicon::define(|def| {
            def.structure("BAD", "(ab")?;
            def.structure("GOOD", "ab")?;
            Ok(())
        })
        .unwrap();
        let (dfa, errors) = lexicon.build_automaton();
        assert_eq!(errors.len(), 1);
        assert_matches!(
            &errors[0],
            LexiconError::Regex { rule, source: RegexError::UnmatchedParen } if rule == "BAD"
        );
        assert_eq!(dfa.recognize(b"ab"), Some(Some(Tag::new(1))));
    }
}
