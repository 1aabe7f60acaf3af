//! Grammar types.

use crate::{types::Map, util::display_fn, util::verify_ident};
use std::{borrow::Cow, fmt, fs, io, marker::PhantomData, path::Path};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}
impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    export_name: Option<Cow<'static, str>>,
    precedence: Option<Precedence>,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn export_name(&self) -> Option<&str> {
        self.export_name.as_deref()
    }

    pub fn precedence(&self) -> Option<Precedence> {
        self.precedence
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            TerminalID::EOI => f.write_str("$eoi"),
            _ => f.write_str(self.export_name().unwrap_or("<unknown>")),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}
impl NonterminalID {
    pub const START: Self = Self::new(0);
    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    export_name: Option<Cow<'static, str>>,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn export_name(&self) -> Option<&str> {
        self.export_name.as_deref()
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            NonterminalID::START => f.write_str("$start"),
            _ => f.write_str(self.export_name().unwrap_or("<unknown>")),
        }
    }
}

/// A grammar symbol, used both as the label of LR(1) transitions and as the
/// elements of production bodies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// The synthetic production `$start -> S`.
    pub const ACCEPT: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    /// The position of the production in declaration order.
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Display for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
    precedence: Option<Precedence>,
}
impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    /// The explicit precedence, or the one of the rightmost terminal.
    pub fn precedence(&self, g: &Grammar) -> Option<Precedence> {
        match self.precedence {
            Some(prec) => Some(prec),
            None => {
                for symbol in self.right.iter().rev() {
                    if let SymbolID::T(t) = symbol {
                        return g.terminals[t].precedence();
                    }
                }
                None
            }
        }
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} ->", g.nonterminals[&self.left()])?;
            if self.right.is_empty() {
                f.write_str(" %empty")?;
            }
            for symbol in self.right() {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
#[non_exhaustive]
pub struct Precedence {
    pub priority: u16,
    pub assoc: Assoc,
}

impl Precedence {
    pub const fn new(priority: u16, assoc: Assoc) -> Self {
        Self { priority, assoc }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
#[non_exhaustive]
pub enum Assoc {
    Left,
    Right,
    Nonassoc,
}

impl fmt::Display for Assoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
            Self::Nonassoc => write!(f, "nonassoc"),
        }
    }
}

/// The grammar definition used to derive the parser tables.
///
/// The production list is augmented with `$start -> S` as the rule
/// [`RuleID::ACCEPT`], and the terminal [`TerminalID::EOI`] stands for the
/// end of input.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub rules: Map<RuleID, Rule>,
    pub start_symbol: NonterminalID,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            write!(f, "{}", terminal)?;
            if let Some(prec) = terminal.precedence() {
                write!(f, " (priority={}, assoc={})", prec.priority, prec.assoc)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.rules.values() {
            write!(f, "[{}] {}", rule.id(), rule.display(self))?;
            if let Some(prec) = &rule.precedence {
                write!(f, " (priority={}, assoc={})", prec.priority, prec.assoc)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarDefError> {
        let source = fs::read_to_string(path).map_err(GrammarDefError::IO)?;
        Self::from_str(&source)
    }

    /// Parse the line-oriented grammar format.
    ///
    /// ```text
    /// %token NUM PLUS        # terminal declarations
    /// %left PLUS             # precedence levels, lowest first
    /// %start E
    /// E -> E PLUS E | NUM
    ///    | LPAREN E RPAREN
    /// ```
    ///
    /// Symbols that are not declared as terminals are nonterminals. An empty
    /// alternative (or `%empty`) derives the empty string, and `%prec NAME`
    /// at the end of an alternative borrows the precedence of `NAME`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Result<Grammar, GrammarDefError> {
        let stmts = parse_stmts(source)?;
        Grammar::define(|g| define_grammar_from_stmts(g, stmts))
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_rule_id: RuleID::OFFSET,
            _marker: PhantomData,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                export_name: None,
                precedence: None,
            },
        );

        def.nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                export_name: None,
            },
        );

        f(&mut def)?;

        def.end()
    }

    pub fn terminal_by_name(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.export_name() == Some(name))
            .map(|t| t.id())
    }

    pub fn nonterminal_by_name(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .values()
            .find(|n| n.export_name() == Some(name))
            .map(|n| n.id())
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> impl fmt::Display + '_ {
        display_fn(move |f| match symbol {
            SymbolID::T(t) => write!(f, "{}", self.terminals[&t]),
            SymbolID::N(n) => write!(f, "{}", self.nonterminals[&n]),
        })
    }
}

#[derive(Debug)]
enum Stmt<'s> {
    Token(Vec<&'s str>),
    Prec(Assoc, Vec<&'s str>),
    Start(&'s str),
    Rule {
        left: &'s str,
        productions: Vec<Production<'s>>,
    },
}

#[derive(Debug, Default)]
struct Production<'s> {
    elems: Vec<&'s str>,
    prec: Option<&'s str>,
}

fn syntax_error(line: usize, msg: impl fmt::Display) -> GrammarDefError {
    GrammarDefError::Syntax(anyhow::anyhow!("line {}: {}", line, msg))
}

fn parse_stmts(source: &str) -> Result<Vec<Stmt<'_>>, GrammarDefError> {
    let mut stmts = vec![];
    for (i, line) in source.lines().enumerate() {
        let lineno = i + 1;
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let words: Vec<&str> = split_words(line).collect();
        let Some((&head, rest)) = words.split_first() else {
            continue;
        };

        match head {
            "%token" => stmts.push(Stmt::Token(rest.to_vec())),
            "%left" => stmts.push(Stmt::Prec(Assoc::Left, rest.to_vec())),
            "%right" => stmts.push(Stmt::Prec(Assoc::Right, rest.to_vec())),
            "%nonassoc" => stmts.push(Stmt::Prec(Assoc::Nonassoc, rest.to_vec())),
            "%start" => match rest {
                [name] => stmts.push(Stmt::Start(*name)),
                _ => return Err(syntax_error(lineno, "%start takes exactly one symbol")),
            },
            "|" => match stmts.last_mut() {
                Some(Stmt::Rule { productions, .. }) => {
                    productions.extend(parse_productions(lineno, rest)?);
                }
                _ => return Err(syntax_error(lineno, "alternative without a rule")),
            },
            directive if directive.starts_with('%') => {
                return Err(syntax_error(
                    lineno,
                    format!("unknown directive `{}'", directive),
                ));
            }
            left => match rest.split_first() {
                Some((&"->", body)) => stmts.push(Stmt::Rule {
                    left,
                    productions: parse_productions(lineno, body)?,
                }),
                _ => return Err(syntax_error(lineno, "expected `->' after the rule name")),
            },
        }
    }
    Ok(stmts)
}

/// Split a line on whitespace, treating `|` and `->` as separate words.
fn split_words(line: &str) -> impl Iterator<Item = &str> + '_ {
    line.split_whitespace().flat_map(|word| {
        let mut parts = vec![];
        let mut rest = word;
        while !rest.is_empty() {
            let cut = [rest.find('|'), rest.find("->")].into_iter().flatten().min();
            match cut {
                Some(0) => {
                    let len = if rest.starts_with('|') { 1 } else { 2 };
                    parts.push(&rest[..len]);
                    rest = &rest[len..];
                }
                Some(pos) => {
                    parts.push(&rest[..pos]);
                    rest = &rest[pos..];
                }
                None => {
                    parts.push(rest);
                    rest = "";
                }
            }
        }
        parts
    })
}

fn parse_productions<'s>(
    line: usize,
    words: &[&'s str],
) -> Result<Vec<Production<'s>>, GrammarDefError> {
    let mut productions = vec![];
    for alternative in words.split(|w| *w == "|") {
        let mut production = Production::default();
        let mut words = alternative.iter();
        while let Some(&word) = words.next() {
            match word {
                "%empty" => (),
                "%prec" => {
                    let name = *words
                        .next()
                        .ok_or_else(|| syntax_error(line, "%prec without a symbol"))?;
                    production.prec = Some(name);
                }
                _ if production.prec.is_some() => {
                    return Err(syntax_error(line, "%prec must end the alternative"));
                }
                symbol => production.elems.push(symbol),
            }
        }
        productions.push(production);
    }
    Ok(productions)
}

fn define_grammar_from_stmts(
    g: &mut GrammarDef<'_>,
    stmts: Vec<Stmt<'_>>,
) -> Result<(), GrammarDefError> {
    // precedence levels first, in the order they are written
    let mut precedences = Map::default();
    let mut next_priority = 0;
    for stmt in &stmts {
        if let Stmt::Prec(assoc, names) = stmt {
            for name in names {
                precedences.insert(*name, Precedence::new(next_priority, *assoc));
            }
            next_priority += 1;
        }
    }

    let mut terminals = Map::default();
    for stmt in &stmts {
        let names = match stmt {
            Stmt::Token(names) | Stmt::Prec(_, names) => names,
            _ => continue,
        };
        for name in names {
            if !terminals.contains_key(name) {
                let id = g.terminal(name, precedences.get(name).copied())?;
                terminals.insert(*name, id);
            }
        }
    }

    // left-hand sides are registered in order so that the first rule
    // provides the default start symbol
    let mut nonterminals = Map::default();
    for stmt in &stmts {
        if let Stmt::Rule { left, .. } = stmt {
            if terminals.contains_key(left) {
                return Err(format!("terminal `{}' used as a rule name", left).into());
            }
            if !nonterminals.contains_key(left) {
                let id = g.nonterminal(left)?;
                nonterminals.insert(*left, id);
            }
        }
    }

    for stmt in &stmts {
        match stmt {
            Stmt::Start(name) => {
                let start_symbol = nonterminals
                    .get(name)
                    .copied()
                    .ok_or_else(|| format!("unknown start symbol: `{}'", name))?;
                g.start_symbol(start_symbol)?;
            }

            Stmt::Rule { left, productions } => {
                let left = nonterminals[left];
                for production in productions {
                    let prec = match production.prec {
                        Some(name) => Some(
                            precedences
                                .get(name)
                                .copied()
                                .ok_or_else(|| format!("unknown precedence name: `{}'", name))?,
                        ),
                        None => None,
                    };

                    let mut right = vec![];
                    for symbol in &production.elems {
                        let s = terminals
                            .get(symbol)
                            .map(|t| SymbolID::T(*t))
                            .or_else(|| nonterminals.get(symbol).map(|n| SymbolID::N(*n)));
                        let s = match s {
                            Some(s) => s,
                            None => {
                                // undeclared symbols are taken as nonterminals
                                let id = g.nonterminal(symbol)?;
                                nonterminals.insert(*symbol, id);
                                SymbolID::N(id)
                            }
                        };
                        right.push(s);
                    }

                    g.rule(left, right, prec)?;
                }
            }

            Stmt::Token(..) | Stmt::Prec(..) => (),
        }
    }

    Ok(())
}

/// The contextual values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef<'def> {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_rule_id: u16,
    _marker: PhantomData<&'def mut ()>,
}

impl<'def> GrammarDef<'def> {
    /// Declare a terminal symbol used in this grammar.
    ///
    /// The name is matched against the class of the incoming tokens.
    pub fn terminal(
        &mut self,
        export_name: &str,
        precedence: Option<Precedence>,
    ) -> Result<TerminalID, GrammarDefError> {
        if !verify_ident(export_name) {
            return Err(GrammarDefError::Other {
                msg: format!("incorrect token name `{}'", export_name),
            });
        }

        if self.is_declared(export_name) {
            return Err(GrammarDefError::Other {
                msg: format!("The symbol `{}' has already been declared", export_name),
            });
        }

        let id = TerminalID::new(self.next_terminal_id);
        self.next_terminal_id += 1;

        self.terminals.insert(
            id,
            Terminal {
                id,
                export_name: Some(export_name.to_owned().into()),
                precedence,
            },
        );

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, export_name: &str) -> Result<NonterminalID, GrammarDefError> {
        if !verify_ident(export_name) {
            return Err(GrammarDefError::Other {
                msg: format!("incorrect symbol name `{}'", export_name),
            });
        }

        if self.is_declared(export_name) {
            return Err(GrammarDefError::Other {
                msg: format!("The symbol `{}' has already been declared", export_name),
            });
        }

        let id = NonterminalID::new(self.next_nonterminal_id);
        self.next_nonterminal_id += 1;

        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                export_name: Some(export_name.to_owned().into()),
            },
        );

        Ok(id)
    }

    fn is_declared(&self, name: &str) -> bool {
        self.terminals
            .values()
            .any(|t| t.export_name() == Some(name))
            || self
                .nonterminals
                .values()
                .any(|n| n.export_name() == Some(name))
    }

    /// Specify a production rule into this grammar.
    pub fn rule<I>(
        &mut self,
        left: NonterminalID,
        right: I,
        precedence: Option<Precedence>,
    ) -> Result<RuleID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        if left == NonterminalID::START {
            return Err("the augmented start symbol cannot have rules".into());
        }

        let right_: Vec<SymbolID> = right.into_iter().collect();
        if right_.contains(&SymbolID::T(TerminalID::EOI)) {
            return Err("the end of input cannot appear in a rule".into());
        }
        for rule in self.rules.values() {
            if rule.left == left && rule.right == right_ {
                return Err(GrammarDefError::Other {
                    msg: "Duplicate production rule detected".into(),
                });
            }
        }

        let id = RuleID::new(self.next_rule_id);
        self.next_rule_id += 1;
        self.rules.insert(
            id,
            Rule {
                id,
                left,
                right: right_,
                precedence,
            },
        );

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        self.start.replace(symbol);
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarDefError> {
        // defaults to the first declared nonterminal
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .find(|id| **id != NonterminalID::START)
                .copied()
                .ok_or_else(|| GrammarDefError::Other {
                    msg: "empty nonterminal symbols".into(),
                })?,
        };

        for nonterminal in self.nonterminals.values() {
            if nonterminal.id() != NonterminalID::START
                && !self.rules.values().any(|r| r.left() == nonterminal.id())
            {
                tracing::warn!("nonterminal `{}' has no production", nonterminal);
            }
        }

        self.rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: NonterminalID::START,
                right: vec![SymbolID::N(start)],
                precedence: None,
            },
        );
        self.rules.sort_keys();

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules: self.rules,
            start_symbol: start,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("Syntax error: {}", _0)]
    Syntax(anyhow::Error),

    #[error("Other error: {}", msg)]
    Other { msg: String },
}
impl From<&str> for GrammarDefError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}
impl From<String> for GrammarDefError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_augments_the_grammar() {
        let g = Grammar::define(|g| {
            let num = g.terminal("NUM", None)?;
            let plus = g.terminal("PLUS", None)?;
            let expr = g.nonterminal("E")?;
            g.rule(expr, [SymbolID::N(expr), SymbolID::T(plus), SymbolID::N(expr)], None)?;
            g.rule(expr, [SymbolID::T(num)], None)?;
            Ok(())
        })
        .unwrap();

        assert_eq!(g.rules.len(), 3);
        let accept = &g.rules[&RuleID::ACCEPT];
        assert_eq!(accept.left(), NonterminalID::START);
        assert_eq!(accept.right(), [SymbolID::N(g.start_symbol)]);
        assert_eq!(g.rules.keys().next(), Some(&RuleID::ACCEPT));
        assert_eq!(g.nonterminal_by_name("E"), Some(g.start_symbol));
        eprintln!("{}", g);
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = Grammar::define(|g| {
            g.terminal("A", None)?;
            g.nonterminal("A")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::Other { .. }));

        let err = Grammar::define(|g| {
            let a = g.terminal("A", None)?;
            let s = g.nonterminal("S")?;
            g.rule(s, [SymbolID::T(a)], None)?;
            g.rule(s, [SymbolID::T(a)], None)?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::Other { .. }));
    }

    #[test]
    fn text_format() {
        let g = Grammar::from_str(
            "\
# arithmetic
%token NUM LPAREN RPAREN
%left PLUS MINUS
%left STAR
%right UMINUS
%start E

E -> E PLUS E | E MINUS E|E STAR E
   | MINUS E %prec UMINUS
   | LPAREN E RPAREN
   | NUM
Opt -> %empty | E
",
        )
        .unwrap();

        assert_eq!(g.rules.len(), 9);
        let plus = g.terminal_by_name("PLUS").unwrap();
        let star = g.terminal_by_name("STAR").unwrap();
        let plus_prec = g.terminals[&plus].precedence().unwrap();
        let star_prec = g.terminals[&star].precedence().unwrap();
        assert_eq!(plus_prec.assoc, Assoc::Left);
        assert!(plus_prec.priority < star_prec.priority);

        let negate = g
            .rules
            .values()
            .find(|r| r.right().len() == 2)
            .unwrap();
        assert_eq!(negate.precedence(&g).unwrap().assoc, Assoc::Right);

        let opt = g.nonterminal_by_name("Opt").unwrap();
        assert!(g
            .rules
            .values()
            .any(|r| r.left() == opt && r.right().is_empty()));
        assert_eq!(g.start_symbol, g.nonterminal_by_name("E").unwrap());
    }

    #[test]
    fn default_start_is_first_rule() {
        let g = Grammar::from_str("S -> A x\nA -> y").unwrap();
        assert_eq!(g.start_symbol, g.nonterminal_by_name("S").unwrap());
        // undeclared symbols are nonterminals
        assert!(g.terminal_by_name("x").is_none());
    }

    #[test]
    fn syntax_errors() {
        for source in ["E E PLUS", "%bogus X", "| NUM", "%start", "E -> NUM %prec"] {
            let err = Grammar::from_str(source).unwrap_err();
            assert!(matches!(err, GrammarDefError::Syntax(..)), "{}", source);
        }
        assert!(matches!(
            Grammar::from_str("%token NUM\nNUM -> NUM"),
            Err(GrammarDefError::Other { .. })
        ));
    }
}
