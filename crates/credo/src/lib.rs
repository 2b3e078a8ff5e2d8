//! credo: a clause-level reasoning engine for a multi-modal first-order
//! epistemic logic with equality
//!
//! The crate provides the two cores an entailment-query driver is built
//! on:
//!
//! - [`setup::Setup`], an immutable-after-populated store of ground
//!   primitive clauses, closed under unit propagation and minimized under
//!   subsumption, with sound-but-incomplete tests for clause subsumption
//!   and (locally restricted) consistency, and cheap scope-bound
//!   snapshots for hypothetical reasoning;
//! - [`formula::Formula`], the tree of clauses, connectives, and modal
//!   operators, with the normalization pipeline ([`formula::Formula::nf`])
//!   that rectifies, pushes negations inward, distributes the modal
//!   operators, and flattens literals until the result is recognizable as
//!   universally closed clauses
//!   ([`formula::Formula::as_univ_clause`]).
//!
//! [`registry::Registry`] supplies the naming context the textual
//! front-end works through. The tokenizer, pretty-printer, and the outer
//! knowledge base that grounds variables and drives the modal decision
//! procedure live outside this crate.

pub mod fol;
pub mod formula;
pub mod registry;
pub mod setup;

// Re-export the commonly used types
pub use fol::{
    BloomSet, Clause, Literal, Sort, Symbol, SymbolFactory, SymbolId, SymbolKind, Term,
    TermFactory, UnitProbe,
};
pub use formula::{BeliefLevel, Formula, FormulaNode, SortedTermSet};
pub use registry::{DefaultLogger, Logger, Registry, RegistryError};
pub use setup::{AddResult, Setup, ShallowCopy, UnitStore};
