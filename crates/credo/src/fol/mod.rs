//! First-order data structures
//!
//! This module provides the ground layer the reasoner works on: sorts,
//! symbols, and hash-consed terms, signed equality literals, clauses, and
//! the Bloom summaries used to prefilter clause-set scans.

pub mod bloom;
pub mod clause;
pub mod literal;
pub mod term;

// Re-export commonly used types
pub use bloom::BloomSet;
pub use clause::{Clause, ClauseDisplay, UnitProbe};
pub use literal::{Literal, LiteralDisplay};
pub use term::{
    Sort, Symbol, SymbolFactory, SymbolId, SymbolKind, Term, TermDisplay, TermFactory,
};
