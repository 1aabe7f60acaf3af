//! Compilation of regular expressions into postfix token streams.
//!
//! Patterns are first lexed into atoms (expanding `\d`, `\w`, `.` and
//! friends), character classes are flattened into parenthesized
//! alternations of byte ranges, and finally the infix stream is turned into
//! postfix form with explicit concatenation. The NFA builder only needs to
//! understand single ranges and the operators `| & * + ?`.

use crate::util::{display_fn, escape_byte};
use bit_vec::BitVec;
use std::fmt;

/// An inclusive range of input bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharRange {
    from: u8,
    to: u8,
}

impl CharRange {
    pub const ANY: Self = Self::new(0, u8::MAX);

    /// Create a range, swapping the bounds if they are given in reverse.
    pub const fn new(from: u8, to: u8) -> Self {
        if from <= to {
            Self { from, to }
        } else {
            Self { from: to, to: from }
        }
    }

    pub const fn single(b: u8) -> Self {
        Self { from: b, to: b }
    }

    pub const fn from(&self) -> u8 {
        self.from
    }

    pub const fn to(&self) -> u8 {
        self.to
    }

    pub const fn is_single(&self) -> bool {
        self.from == self.to
    }

    pub const fn contains(&self, b: u8) -> bool {
        self.from <= b && b <= self.to
    }

    /// Iterate over every byte covered by this range.
    pub fn bytes(&self) -> impl Iterator<Item = u8> {
        self.from..=self.to
    }
}

impl fmt::Display for CharRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", escape_byte(self.from))
        } else {
            write!(f, "{}-{}", escape_byte(self.from), escape_byte(self.to))
        }
    }
}

/// A unit of a compiled regular expression.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegexToken {
    Range(CharRange),
    Alt,
    Concat,
    Star,
    Plus,
    Optional,
    LParen,
    RParen,
}

impl RegexToken {
    fn precedence(&self) -> u8 {
        match self {
            Self::LParen => 1,
            Self::Alt => 2,
            Self::Concat => 3,
            Self::Star | Self::Plus | Self::Optional => 4,
            Self::Range(..) | Self::RParen => 0,
        }
    }
}

impl fmt::Display for RegexToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range(range) => write!(f, "[{}]", range),
            Self::Alt => f.write_str("|"),
            Self::Concat => f.write_str("&"),
            Self::Star => f.write_str("*"),
            Self::Plus => f.write_str("+"),
            Self::Optional => f.write_str("?"),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
        }
    }
}

/// Render a token stream separated by spaces.
pub fn display_tokens(tokens: &[RegexToken]) -> impl fmt::Display + '_ {
    display_fn(move |f| {
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegexError {
    #[error("brackets not matched")]
    UnmatchedParen,

    #[error("an operator is missing its operand")]
    MissingOperand,

    #[error("malformed expression")]
    Malformed,

    #[error("the pattern ends with a lone backslash")]
    TrailingBackslash,

    #[error("unterminated character class")]
    UnterminatedClass,

    #[error("character class matches nothing")]
    EmptyClass,

    #[error("range `{}-{}' is out of order", _0, _1)]
    ReversedRange(char, char),

    #[error("`\\{}' cannot be used inside a character class", _0)]
    NegatedClassInClass(char),

    #[error("empty pattern")]
    Empty,
}

/// Characters treated as operators by the pattern syntax.
pub const METACHARACTERS: &str = "&|*.+[-]^?()`\\";

/// Escape every metacharacter so that `literal` is matched verbatim.
pub fn escape_literal(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for ch in literal.chars() {
        if METACHARACTERS.contains(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Compile a pattern into a postfix token stream.
pub fn compile(pattern: &str) -> Result<Vec<RegexToken>, RegexError> {
    let span = tracing::trace_span!("compile", pattern);
    let _entered = span.enter();

    let tokens = tokenize(pattern)?;
    tracing::trace!("infix: {}", display_tokens(&tokens));
    let postfix = to_postfix(&tokens)?;
    tracing::trace!("postfix: {}", display_tokens(&postfix));
    Ok(postfix)
}

/// Convert a pattern into an infix token stream with character classes
/// flattened into alternations of ranges.
pub fn tokenize(pattern: &str) -> Result<Vec<RegexToken>, RegexError> {
    let atoms = lex(pattern.as_bytes())?;

    let mut tokens = Vec::with_capacity(atoms.len());
    let mut i = 0;
    while i < atoms.len() {
        let atom = atoms[i];
        i += 1;
        if atom.escaped {
            tokens.push(RegexToken::Range(CharRange::single(atom.byte)));
            continue;
        }
        let token = match atom.byte {
            b'|' => RegexToken::Alt,
            b'*' => RegexToken::Star,
            b'+' => RegexToken::Plus,
            b'?' => RegexToken::Optional,
            b'(' => RegexToken::LParen,
            b')' => RegexToken::RParen,
            b'[' => {
                i = expand_class(&atoms, i, &mut tokens)?;
                continue;
            }
            b => RegexToken::Range(CharRange::single(b)),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

/// Shunting-yard conversion with implicit concatenation.
pub fn to_postfix(tokens: &[RegexToken]) -> Result<Vec<RegexToken>, RegexError> {
    let mut output = Vec::with_capacity(tokens.len() * 2);
    let mut ops: Vec<RegexToken> = vec![];

    let push_operator = |op: RegexToken, ops: &mut Vec<RegexToken>, output: &mut Vec<RegexToken>| {
        while let Some(&top) = ops.last() {
            if top.precedence() < op.precedence() {
                break;
            }
            output.push(top);
            ops.pop();
        }
        ops.push(op);
    };

    // whether the previous token produced a value (a closure counts as one)
    let mut last_value = false;
    for &token in tokens {
        match token {
            RegexToken::Star | RegexToken::Plus | RegexToken::Optional => {
                push_operator(token, &mut ops, &mut output);
                last_value = true;
            }
            RegexToken::Alt | RegexToken::Concat => {
                push_operator(token, &mut ops, &mut output);
                last_value = false;
            }
            RegexToken::LParen => {
                if last_value {
                    push_operator(RegexToken::Concat, &mut ops, &mut output);
                }
                ops.push(token);
                last_value = false;
            }
            RegexToken::RParen => {
                loop {
                    match ops.pop() {
                        Some(RegexToken::LParen) => break,
                        Some(op) => output.push(op),
                        None => return Err(RegexError::UnmatchedParen),
                    }
                }
                last_value = true;
            }
            RegexToken::Range(..) => {
                if last_value {
                    push_operator(RegexToken::Concat, &mut ops, &mut output);
                }
                output.push(token);
                last_value = true;
            }
        }
    }

    while let Some(op) = ops.pop() {
        if op == RegexToken::LParen {
            return Err(RegexError::UnmatchedParen);
        }
        output.push(op);
    }

    validate(&output)?;
    Ok(output)
}

/// Check that the postfix stream reduces to exactly one operand.
fn validate(postfix: &[RegexToken]) -> Result<(), RegexError> {
    let mut depth = 0usize;
    for token in postfix {
        match token {
            RegexToken::Range(..) => depth += 1,
            RegexToken::Star | RegexToken::Plus | RegexToken::Optional => {
                if depth == 0 {
                    return Err(RegexError::MissingOperand);
                }
            }
            RegexToken::Alt | RegexToken::Concat => {
                if depth < 2 {
                    return Err(RegexError::MissingOperand);
                }
                depth -= 1;
            }
            RegexToken::LParen | RegexToken::RParen => return Err(RegexError::UnmatchedParen),
        }
    }
    match depth {
        0 => Err(RegexError::Empty),
        1 => Ok(()),
        _ => Err(RegexError::Malformed),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Atom {
    byte: u8,
    escaped: bool,
}

impl Atom {
    const fn plain(byte: u8) -> Self {
        Self {
            byte,
            escaped: false,
        }
    }

    const fn escaped(byte: u8) -> Self {
        Self {
            byte,
            escaped: true,
        }
    }

    fn is(&self, b: u8) -> bool {
        !self.escaped && self.byte == b
    }
}

/// Predefined classes: `(negated, members)`.
fn class_escape(c: u8) -> Option<(bool, &'static [u8])> {
    const DIGIT: &[u8] = b"0-9";
    const SPACE: &[u8] = b" \x0c\n\r\t\x0b";
    const WORD: &[u8] = b"A-Za-z0-9_";
    match c {
        b'd' => Some((false, DIGIT)),
        b'D' => Some((true, DIGIT)),
        b's' => Some((false, SPACE)),
        b'S' => Some((true, SPACE)),
        b'w' => Some((false, WORD)),
        b'W' => Some((true, WORD)),
        _ => None,
    }
}

fn literal_escape(c: u8) -> u8 {
    match c {
        b'f' => 0x0c,
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'v' => 0x0b,
        c => c,
    }
}

fn lex(pattern: &[u8]) -> Result<Vec<Atom>, RegexError> {
    let mut atoms = Vec::with_capacity(pattern.len());
    let mut in_class = false;
    let mut bytes = pattern.iter().copied();
    while let Some(b) = bytes.next() {
        match b {
            b'\\' => {
                let c = bytes.next().ok_or(RegexError::TrailingBackslash)?;
                match class_escape(c) {
                    Some((true, _)) if in_class => {
                        return Err(RegexError::NegatedClassInClass(c as char));
                    }
                    Some((_, members)) if in_class => {
                        atoms.extend(members.iter().map(|&m| Atom::plain(m)));
                    }
                    Some((negated, members)) => {
                        atoms.push(Atom::plain(b'['));
                        if negated {
                            atoms.push(Atom::plain(b'^'));
                        }
                        atoms.extend(members.iter().map(|&m| Atom::plain(m)));
                        atoms.push(Atom::plain(b']'));
                    }
                    None => atoms.push(Atom::escaped(literal_escape(c))),
                }
            }
            b'.' if !in_class => {
                atoms.extend([Atom::plain(b'['), Atom::plain(b'^'), Atom::plain(b']')]);
            }
            b'[' if !in_class => {
                in_class = true;
                atoms.push(Atom::plain(b));
            }
            b']' if in_class => {
                in_class = false;
                atoms.push(Atom::plain(b));
            }
            _ => atoms.push(Atom::plain(b)),
        }
    }
    Ok(atoms)
}

/// Expand the class starting right after its `[`, returning the index
/// following the closing `]`.
fn expand_class(
    atoms: &[Atom],
    mut i: usize,
    tokens: &mut Vec<RegexToken>,
) -> Result<usize, RegexError> {
    let mut members = BitVec::from_elem(256, false);

    let negated = matches!(atoms.get(i), Some(a) if a.is(b'^'));
    if negated {
        i += 1;
    }

    loop {
        let atom = *atoms.get(i).ok_or(RegexError::UnterminatedClass)?;
        i += 1;
        if atom.is(b']') {
            break;
        }
        match (atoms.get(i), atoms.get(i + 1)) {
            (Some(dash), Some(to)) if dash.is(b'-') && !to.is(b']') => {
                if atom.byte > to.byte {
                    return Err(RegexError::ReversedRange(
                        char::from(atom.byte),
                        char::from(to.byte),
                    ));
                }
                for b in atom.byte..=to.byte {
                    members.set(usize::from(b), true);
                }
                i += 2;
            }
            _ => members.set(usize::from(atom.byte), true),
        }
    }

    if negated {
        members.negate();
    }

    let ranges = runs(&members);
    if ranges.is_empty() {
        return Err(RegexError::EmptyClass);
    }

    tokens.push(RegexToken::LParen);
    for (k, range) in ranges.into_iter().enumerate() {
        if k > 0 {
            tokens.push(RegexToken::Alt);
        }
        tokens.push(RegexToken::Range(range));
    }
    tokens.push(RegexToken::RParen);

    Ok(i)
}

/// Re-encode a membership set as maximal runs of consecutive bytes.
fn runs(members: &BitVec) -> Vec<CharRange> {
    let mut ranges = vec![];
    let mut start = None;
    for b in 0..=u8::MAX {
        match (members[usize::from(b)], start) {
            (true, None) => start = Some(b),
            (false, Some(s)) => {
                ranges.push(CharRange::new(s, b - 1));
                start = None;
            }
            _ => (),
        }
    }
    if let Some(s) = start {
        ranges.push(CharRange::new(s, u8::MAX));
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{Automaton, Tag};
    use RegexToken::*;

    fn r(from: u8, to: u8) -> RegexToken {
        Range(CharRange::new(from, to))
    }

    fn c(b: u8) -> RegexToken {
        Range(CharRange::single(b))
    }

    #[test]
    fn implicit_concatenation() {
        assert_eq!(compile("ab").unwrap(), [c(b'a'), c(b'b'), Concat]);
        assert_eq!(
            compile("a(b|c)*d").unwrap(),
            [c(b'a'), c(b'b'), c(b'c'), Alt, Star, Concat, c(b'd'), Concat]
        );
        assert_eq!(
            compile("a|bc*").unwrap(),
            [c(b'a'), c(b'b'), c(b'c'), Star, Concat, Alt]
        );
        assert_eq!(compile("a+?").unwrap(), [c(b'a'), Plus, Optional]);
    }

    #[test]
    fn character_classes() {
        assert_eq!(tokenize("[a-c]").unwrap(), [LParen, r(b'a', b'c'), RParen]);
        assert_eq!(
            tokenize("[ca-b]").unwrap(),
            [LParen, r(b'a', b'c'), RParen],
            "adjacent members are merged into one run"
        );
        assert_eq!(
            tokenize("[xa-c]").unwrap(),
            [LParen, r(b'a', b'c'), Alt, c(b'x'), RParen]
        );
        assert_eq!(
            tokenize("[^\\n]").unwrap(),
            [LParen, r(0, 9), Alt, r(11, 255), RParen]
        );
        assert_eq!(tokenize(".").unwrap(), [LParen, r(0, 255), RParen]);
        assert_eq!(tokenize("[-a]").unwrap(), [LParen, c(b'-'), Alt, c(b'a'), RParen]);
    }

    #[test]
    fn predefined_classes() {
        assert_eq!(
            compile("\\d+").unwrap(),
            [r(b'0', b'9'), Plus],
            "a single-range class is just a group"
        );
        assert_eq!(
            tokenize("[\\d_]").unwrap(),
            [LParen, r(b'0', b'9'), Alt, c(b'_'), RParen]
        );
        assert_eq!(
            tokenize("\\D").unwrap(),
            [LParen, r(0, b'0' - 1), Alt, r(b'9' + 1, 255), RParen]
        );
        assert_eq!(tokenize("\\t").unwrap(), [c(b'\t')]);
        assert_eq!(
            tokenize("[\\W]"),
            Err(RegexError::NegatedClassInClass('W'))
        );
    }

    #[test]
    fn escaped_operators_are_literals() {
        assert_eq!(compile("\\(\\*").unwrap(), [c(b'('), c(b'*'), Concat]);
        assert_eq!(compile("\\+").unwrap(), [c(b'+')]);
        assert_eq!(
            compile(&escape_literal("a+b")).unwrap(),
            [c(b'a'), c(b'+'), Concat, c(b'b'), Concat]
        );
        assert_eq!(escape_literal("[=]"), "\\[=\\]");
    }

    #[test]
    fn malformed_patterns() {
        assert_eq!(compile("(ab"), Err(RegexError::UnmatchedParen));
        assert_eq!(compile("ab)"), Err(RegexError::UnmatchedParen));
        assert_eq!(compile("*a"), Err(RegexError::MissingOperand));
        assert_eq!(compile("a|"), Err(RegexError::MissingOperand));
        assert_eq!(compile(""), Err(RegexError::Empty));
        assert_eq!(compile("ab\\"), Err(RegexError::TrailingBackslash));
        assert_eq!(compile("[ab"), Err(RegexError::UnterminatedClass));
        assert_eq!(compile("[]"), Err(RegexError::EmptyClass));
        assert_eq!(compile("[z-a]"), Err(RegexError::ReversedRange('z', 'a')));
        assert_eq!(
            compile("[0-9z-a]"),
            Err(RegexError::ReversedRange('z', 'a'))
        );
        assert_eq!(tokenize("[a-a]").unwrap(), [LParen, c(b'a'), RParen]);
    }

    fn matcher(pattern: &str) -> Automaton {
        let postfix = compile(pattern).unwrap();
        Automaton::from_postfix(&postfix, Tag::new(0)).unwrap()
    }

    #[test]
    fn escape_classes() {
        let space = matcher("\\s");
        for b in [b' ', b'\t', b'\n', b'\r', 0x0b, 0x0c] {
            assert!(space.accepts(&[b]), "{:#04x}", b);
        }
        assert!(!space.accepts(b"a"));

        let non_space = matcher("\\S");
        assert!(!non_space.accepts(b" "));
        assert!(!non_space.accepts(b"\x0b"));
        assert!(non_space.accepts(b"a"));

        let word = matcher("\\w+");
        assert!(word.accepts(b"_az09Z"));
        assert!(!word.accepts(b"a-b"));

        let non_word = matcher("\\W");
        assert!(non_word.accepts(b"-"));
        assert!(!non_word.accepts(b"_"));

        let controls = matcher("\\f\\v\\r\\n");
        assert!(controls.accepts(b"\x0c\x0b\r\n"));
        assert!(!controls.accepts(b"fvrn"));

        let in_class = matcher("[\\s\\w]+");
        assert!(in_class.accepts(b"a_\x0c\x0b 1"));
        assert!(!in_class.accepts(b"a-b"));
    }
}
