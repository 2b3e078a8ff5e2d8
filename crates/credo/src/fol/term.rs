//! Sorts, symbols, and hash-consed terms
//!
//! Symbols are allocated by a [`SymbolFactory`] and terms by a
//! [`TermFactory`]. Terms are hash-consed: building the same symbol over the
//! same arguments twice yields the same [`Term`], so term equality is
//! identity. A term carries its symbol (and with it sort, kind, and arity)
//! inline; argument vectors live in the factory.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A sort tag. Sorts partition the domain; they carry no structure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sort(pub(crate) u32);

impl Sort {
    /// Get the raw tag value (for debugging/serialization)
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// ID of an allocated symbol
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    /// Get the raw ID value (for debugging/serialization)
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// What a symbol stands for
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    /// A first-order variable
    Variable,
    /// A standard name (a rigid constant that denotes itself)
    Name,
    /// A function symbol with arity
    Function,
}

/// A symbol: a variable, a standard name, or a function symbol.
///
/// Symbols are `Copy` and ordered by allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub(crate) id: SymbolId,
    pub(crate) kind: SymbolKind,
    pub(crate) sort: Sort,
    pub(crate) arity: u8,
}

impl Symbol {
    pub fn id(self) -> SymbolId {
        self.id
    }

    pub fn kind(self) -> SymbolKind {
        self.kind
    }

    pub fn sort(self) -> Sort {
        self.sort
    }

    pub fn arity(self) -> u8 {
        self.arity
    }

    pub fn is_variable(self) -> bool {
        self.kind == SymbolKind::Variable
    }

    pub fn is_name(self) -> bool {
        self.kind == SymbolKind::Name
    }

    pub fn is_function(self) -> bool {
        self.kind == SymbolKind::Function
    }
}

/// Allocates sorts and symbols.
///
/// Fresh variables for rectification and flattening come from here.
#[derive(Debug, Clone, Default)]
pub struct SymbolFactory {
    next_sort: u32,
    next_symbol: u32,
}

impl SymbolFactory {
    pub fn new() -> Self {
        SymbolFactory::default()
    }

    /// Allocate a new sort tag
    pub fn new_sort(&mut self) -> Sort {
        let s = Sort(self.next_sort);
        self.next_sort += 1;
        s
    }

    /// Allocate a fresh variable symbol of the given sort
    pub fn new_variable(&mut self, sort: Sort) -> Symbol {
        self.new_symbol(SymbolKind::Variable, sort, 0)
    }

    /// Allocate a fresh name symbol of the given sort
    pub fn new_name(&mut self, sort: Sort) -> Symbol {
        self.new_symbol(SymbolKind::Name, sort, 0)
    }

    /// Allocate a fresh function symbol of the given sort and arity
    pub fn new_function(&mut self, sort: Sort, arity: u8) -> Symbol {
        self.new_symbol(SymbolKind::Function, sort, arity)
    }

    fn new_symbol(&mut self, kind: SymbolKind, sort: Sort, arity: u8) -> Symbol {
        let id = SymbolId(self.next_symbol);
        self.next_symbol += 1;
        Symbol {
            id,
            kind,
            sort,
            arity,
        }
    }
}

/// A hash-consed term.
///
/// Terms are `Copy` ids into the [`TermFactory`] that created them; two
/// terms are equal iff their ids are equal. The head symbol is carried
/// inline so that kind, sort, and arity queries need no factory access;
/// argument access goes through the factory.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Term {
    pub(crate) id: u32,
    pub(crate) symbol: Symbol,
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// Function applications order before variables and names, so that the
// canonical literal keeps its function side on the left. Ties break by id,
// which keeps the order total and consistent with identity equality.
impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .is_function()
            .cmp(&self.is_function())
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Term {
    pub fn id(self) -> u32 {
        self.id
    }

    pub fn symbol(self) -> Symbol {
        self.symbol
    }

    pub fn sort(self) -> Sort {
        self.symbol.sort
    }

    pub fn arity(self) -> u8 {
        self.symbol.arity
    }

    pub fn is_variable(self) -> bool {
        self.symbol.is_variable()
    }

    pub fn is_name(self) -> bool {
        self.symbol.is_name()
    }

    pub fn is_function(self) -> bool {
        self.symbol.is_function()
    }
}

/// Interned term data: head symbol plus argument terms
#[derive(Debug, Clone)]
struct TermData {
    symbol: Symbol,
    args: Vec<Term>,
}

/// Hash-consing term factory.
///
/// Interns `(symbol, args)` pairs so that structural equality coincides
/// with id equality. Passed explicitly wherever fresh terms are built
/// (normalization, flattening, the registry) rather than living in global
/// state.
#[derive(Debug, Clone, Default)]
pub struct TermFactory {
    terms: Vec<TermData>,
    lookup: HashMap<(SymbolId, Vec<Term>), u32>,
}

impl TermFactory {
    pub fn new() -> Self {
        TermFactory::default()
    }

    /// Intern a term, returning its id (get-or-create).
    ///
    /// The argument count must match the symbol's arity; variables and
    /// names take no arguments.
    pub fn term(&mut self, symbol: Symbol, args: Vec<Term>) -> Term {
        debug_assert_eq!(symbol.arity as usize, args.len());
        debug_assert!(symbol.is_function() || args.is_empty());
        if let Some(&id) = self.lookup.get(&(symbol.id, args.clone())) {
            return Term { id, symbol };
        }
        let id = self.terms.len() as u32;
        self.lookup.insert((symbol.id, args.clone()), id);
        self.terms.push(TermData { symbol, args });
        Term { id, symbol }
    }

    /// Intern the term for a variable symbol
    pub fn var(&mut self, symbol: Symbol) -> Term {
        debug_assert!(symbol.is_variable());
        self.term(symbol, vec![])
    }

    /// Intern the term for a name symbol
    pub fn name(&mut self, symbol: Symbol) -> Term {
        debug_assert!(symbol.is_name());
        self.term(symbol, vec![])
    }

    /// Allocate a brand-new variable of the given sort and intern its term
    pub fn fresh_var(&mut self, sort: Sort, symbols: &mut SymbolFactory) -> Term {
        let x = symbols.new_variable(sort);
        self.var(x)
    }

    /// Argument terms of `t` (empty for variables and names)
    pub fn args(&self, t: Term) -> &[Term] {
        &self.terms[t.id as usize].args
    }

    /// A term is ground iff no variable occurs in it
    pub fn ground(&self, t: Term) -> bool {
        !t.is_variable() && self.args(t).iter().all(|&a| self.ground(a))
    }

    /// A term is primitive iff it is a function application and every
    /// argument is a name or a variable.
    pub fn primitive(&self, t: Term) -> bool {
        t.is_function() && self.args(t).iter().all(|a| a.is_name() || a.is_variable())
    }

    /// The weaker form used during flattening: every argument is a name or
    /// a variable (for variables and names this holds vacuously).
    pub fn quasiprimitive(&self, t: Term) -> bool {
        self.args(t).iter().all(|a| a.is_name() || a.is_variable())
    }

    /// Does `sub` occur in `t` (including `t` itself)?
    pub fn contains(&self, t: Term, sub: Term) -> bool {
        t == sub || self.args(t).iter().any(|&a| self.contains(a, sub))
    }

    /// Visit `t` and every subterm, outermost first
    pub fn for_each_subterm(&self, t: Term, f: &mut impl FnMut(Term)) {
        f(t);
        // args is cloned to release the borrow; argument vectors are short
        let args = self.terms[t.id as usize].args.clone();
        for a in args {
            self.for_each_subterm(a, f);
        }
    }

    /// Collect the variables occurring in `t` into `out`
    pub fn collect_variables(&self, t: Term, out: &mut Vec<Term>) {
        if t.is_variable() {
            out.push(t);
        } else {
            let args = self.terms[t.id as usize].args.clone();
            for a in args {
                self.collect_variables(a, out);
            }
        }
    }

    /// Rebuild `t` with every occurrence of `old` replaced by `new`
    pub fn replace(&mut self, t: Term, old: Term, new: Term) -> Term {
        if t == old {
            return new;
        }
        if !t.is_function() {
            return t;
        }
        let args = self.terms[t.id as usize].args.clone();
        if !args.iter().any(|&a| self.contains(a, old)) {
            return t;
        }
        let new_args = args.into_iter().map(|a| self.replace(a, old, new)).collect();
        self.term(t.symbol, new_args)
    }

    /// Rebuild `t` under a partial map, outermost occurrence first.
    ///
    /// Where `theta` returns `Some`, the whole subterm is replaced and not
    /// descended into; elsewhere the arguments are mapped recursively.
    pub fn map_term(&mut self, t: Term, theta: &mut impl FnMut(Term) -> Option<Term>) -> Term {
        if let Some(u) = theta(t) {
            return u;
        }
        if !t.is_function() {
            return t;
        }
        let args = self.terms[t.id as usize].args.clone();
        let new_args: Vec<Term> = args.into_iter().map(|a| self.map_term(a, theta)).collect();
        self.term(t.symbol, new_args)
    }

    /// Number of interned terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Format `t` with full argument structure
    pub fn display(&self, t: Term) -> TermDisplay<'_> {
        TermDisplay { term: t, factory: self }
    }
}

/// Display wrapper that resolves argument structure through the factory
pub struct TermDisplay<'a> {
    term: Term,
    factory: &'a TermFactory,
}

impl fmt::Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.term)?;
        let args = self.factory.args(self.term);
        if !args.is_empty() {
            write!(f, "(")?;
            for (i, &a) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", self.factory.display(a))?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

// Bare Display shows the head symbol only (argument structure needs the
// factory; see TermDisplay).
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol.kind {
            SymbolKind::Variable => write!(f, "x{}", self.symbol.id.0),
            SymbolKind::Name => write!(f, "n{}", self.symbol.id.0),
            SymbolKind::Function => write!(f, "f{}", self.symbol.id.0),
        }
    }
}
