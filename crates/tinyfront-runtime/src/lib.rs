//! Runtime implementation of the table-driven shift-reduce parser.

pub mod definition;
pub mod parser;
pub mod tree;

pub use crate::{
    definition::{ParseAction, ParseTable, Token},
    parser::{Outcome, ParseError, ParseOutput, Parser, SkippedToken},
    tree::ParseNode,
};
