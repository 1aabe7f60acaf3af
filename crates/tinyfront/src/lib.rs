//! A compiler front end built from a lexicon and a grammar.
//!
//! Lexical rules are compiled from regular expressions into one
//! deterministic automaton used by a maximal-munch scanner, and the grammar
//! is turned into a canonical LR(1) (or LALR(1)) parse table driven by
//! `tinyfront-runtime`.

pub mod automaton;
pub mod first_sets;
pub mod grammar;
pub mod lexicon;
pub mod lr1;
pub mod minimize;
pub mod parser;
pub mod pipeline;
pub mod regex;
pub mod scan;
pub mod subset;
pub mod table;
pub mod types;
pub mod util;

pub use crate::pipeline::{Frontend, FrontendConfig, FrontendError, Parsed};
