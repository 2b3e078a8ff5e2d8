//! Formula trees for the epistemic language
//!
//! The atomic entities are clauses; the connectives are negation,
//! disjunction, and the existential quantifier; the modal operators are
//! knowledge, consistency (conceivability), conditional belief, and the
//! epistemic guarantee. Formulas are built by the parser, normalized by
//! [`Formula::nf`], and are immutable apart from in-place rectification
//! and free substitution.
//!
//! Every formula lazily caches its free-variable set; the two mutating
//! operations clear the cache along the paths they touch.

pub mod nf;

use crate::fol::{Clause, Literal, Sort, Term, TermFactory};
use indexmap::{IndexMap, IndexSet};
use std::cell::OnceCell;
use std::collections::HashSet;
use std::fmt;

/// Reasoning depth parameter of the modal operators; opaque to this crate
pub type BeliefLevel = u32;

/// Terms grouped per sort, insertion-ordered within each group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedTermSet {
    by_sort: IndexMap<Sort, IndexSet<Term>>,
}

impl SortedTermSet {
    pub fn new() -> Self {
        SortedTermSet::default()
    }

    /// Insert a term into its sort's group; false if already present
    pub fn insert(&mut self, t: Term) -> bool {
        self.by_sort.entry(t.sort()).or_default().insert(t)
    }

    pub fn remove(&mut self, t: Term) -> bool {
        match self.by_sort.get_mut(&t.sort()) {
            Some(group) => group.shift_remove(&t),
            None => false,
        }
    }

    pub fn contains(&self, t: Term) -> bool {
        self.by_sort
            .get(&t.sort())
            .is_some_and(|group| group.contains(&t))
    }

    pub fn is_empty(&self) -> bool {
        self.by_sort.values().all(|group| group.is_empty())
    }

    pub fn len(&self) -> usize {
        self.by_sort.values().map(|group| group.len()).sum()
    }

    /// All terms, grouped by sort in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = Term> + '_ {
        self.by_sort.values().flat_map(|group| group.iter().copied())
    }

    /// The terms of one sort
    pub fn of_sort(&self, sort: Sort) -> impl Iterator<Item = Term> + '_ {
        self.by_sort
            .get(&sort)
            .into_iter()
            .flat_map(|group| group.iter().copied())
    }
}

impl Extend<Term> for SortedTermSet {
    fn extend<I: IntoIterator<Item = Term>>(&mut self, iter: I) {
        for t in iter {
            self.insert(t);
        }
    }
}

/// The variants of the formula tree
#[derive(Debug, Clone)]
pub enum FormulaNode {
    /// A clause
    Atomic(Clause),
    /// Negation
    Not(Box<Formula>),
    /// Disjunction
    Or(Box<Formula>, Box<Formula>),
    /// Existential quantification over a variable
    Exists(Term, Box<Formula>),
    /// Knowledge at a belief level
    Know(BeliefLevel, Box<Formula>),
    /// Consistency (conceivability) at a belief level
    Cons(BeliefLevel, Box<Formula>),
    /// Conditional belief with the cached `¬antecedent ∨ consequent`
    Bel {
        k: BeliefLevel,
        l: BeliefLevel,
        ante: Box<Formula>,
        conse: Box<Formula>,
        either: Box<Formula>,
    },
    /// Epistemic guarantee
    Guarantee(Box<Formula>),
}

/// A formula with its lazily cached free-variable set
#[derive(Debug)]
pub struct Formula {
    pub(crate) node: FormulaNode,
    pub(crate) free_vars: OnceCell<SortedTermSet>,
}

impl Clone for Formula {
    fn clone(&self) -> Self {
        Formula::from_node(self.node.clone())
    }
}

impl PartialEq for Formula {
    fn eq(&self, other: &Self) -> bool {
        match (&self.node, &other.node) {
            (FormulaNode::Atomic(c), FormulaNode::Atomic(d)) => c == d,
            (FormulaNode::Not(a), FormulaNode::Not(b)) => a == b,
            (FormulaNode::Or(a1, b1), FormulaNode::Or(a2, b2)) => a1 == a2 && b1 == b2,
            (FormulaNode::Exists(x, a), FormulaNode::Exists(y, b)) => x == y && a == b,
            (FormulaNode::Know(k1, a), FormulaNode::Know(k2, b)) => k1 == k2 && a == b,
            (FormulaNode::Cons(k1, a), FormulaNode::Cons(k2, b)) => k1 == k2 && a == b,
            (
                FormulaNode::Bel {
                    k: k1,
                    l: l1,
                    ante: a1,
                    either: e1,
                    ..
                },
                FormulaNode::Bel {
                    k: k2,
                    l: l2,
                    ante: a2,
                    either: e2,
                    ..
                },
            ) => k1 == k2 && l1 == l2 && a1 == a2 && e1 == e2,
            (FormulaNode::Guarantee(a), FormulaNode::Guarantee(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Formula {}

impl Formula {
    pub(crate) fn from_node(node: FormulaNode) -> Self {
        Formula {
            node,
            free_vars: OnceCell::new(),
        }
    }

    /// An atomic formula holding a clause
    pub fn atomic(c: Clause) -> Self {
        Formula::from_node(FormulaNode::Atomic(c))
    }

    /// Negation
    pub fn not(alpha: Formula) -> Self {
        Formula::from_node(FormulaNode::Not(Box::new(alpha)))
    }

    /// Disjunction
    pub fn or(lhs: Formula, rhs: Formula) -> Self {
        Formula::from_node(FormulaNode::Or(Box::new(lhs), Box::new(rhs)))
    }

    /// Existential quantification; `x` must be a variable term
    pub fn exists(x: Term, alpha: Formula) -> Self {
        debug_assert!(x.is_variable());
        Formula::from_node(FormulaNode::Exists(x, Box::new(alpha)))
    }

    /// Knowledge at belief level `k`
    pub fn know(k: BeliefLevel, alpha: Formula) -> Self {
        Formula::from_node(FormulaNode::Know(k, Box::new(alpha)))
    }

    /// Consistency at belief level `k`
    pub fn cons(k: BeliefLevel, alpha: Formula) -> Self {
        Formula::from_node(FormulaNode::Cons(k, Box::new(alpha)))
    }

    /// Conditional belief; builds and caches `¬antecedent ∨ consequent`
    pub fn bel(k: BeliefLevel, l: BeliefLevel, ante: Formula, conse: Formula) -> Self {
        let either = Formula::or(Formula::not(ante.clone()), conse.clone());
        Formula::bel_with_either(k, l, ante, conse, either)
    }

    /// Conditional belief with a precomputed `¬antecedent ∨ consequent`
    pub fn bel_with_either(
        k: BeliefLevel,
        l: BeliefLevel,
        ante: Formula,
        conse: Formula,
        either: Formula,
    ) -> Self {
        Formula::from_node(FormulaNode::Bel {
            k,
            l,
            ante: Box::new(ante),
            conse: Box::new(conse),
            either: Box::new(either),
        })
    }

    /// Epistemic guarantee
    pub fn guarantee(alpha: Formula) -> Self {
        Formula::from_node(FormulaNode::Guarantee(Box::new(alpha)))
    }

    pub fn node(&self) -> &FormulaNode {
        &self.node
    }

    /// The free variables, grouped by sort; computed on first use
    pub fn free_vars(&self, tf: &TermFactory) -> &SortedTermSet {
        self.free_vars.get_or_init(|| self.compute_free_vars(tf))
    }

    fn compute_free_vars(&self, tf: &TermFactory) -> SortedTermSet {
        let mut set = SortedTermSet::new();
        match &self.node {
            FormulaNode::Atomic(c) => {
                let mut vars = Vec::new();
                c.collect_variables(tf, &mut vars);
                set.extend(vars);
            }
            FormulaNode::Not(a) | FormulaNode::Know(_, a) | FormulaNode::Cons(_, a)
            | FormulaNode::Guarantee(a) => {
                set = a.free_vars(tf).clone();
            }
            FormulaNode::Or(a, b) => {
                set = a.free_vars(tf).clone();
                set.extend(b.free_vars(tf).iter());
            }
            FormulaNode::Exists(x, a) => {
                set = a.free_vars(tf).clone();
                set.remove(*x);
            }
            FormulaNode::Bel { either, .. } => {
                set = either.free_vars(tf).clone();
            }
        }
        set
    }

    /// Substitute on free occurrences only; binders shadow their variable
    /// for the subtree they scope over.
    pub fn substitute_free(
        &mut self,
        theta: &mut dyn FnMut(Term) -> Option<Term>,
        tf: &mut TermFactory,
    ) {
        let mut bound = HashSet::new();
        self.substitute_scoped(theta, tf, &mut bound);
    }

    fn substitute_scoped(
        &mut self,
        theta: &mut dyn FnMut(Term) -> Option<Term>,
        tf: &mut TermFactory,
        bound: &mut HashSet<Term>,
    ) {
        self.free_vars = OnceCell::new();
        match &mut self.node {
            FormulaNode::Atomic(c) => {
                *c = c.map_terms(tf, &mut |t| {
                    if bound.contains(&t) {
                        None
                    } else {
                        theta(t)
                    }
                });
            }
            FormulaNode::Not(a)
            | FormulaNode::Know(_, a)
            | FormulaNode::Cons(_, a)
            | FormulaNode::Guarantee(a) => {
                a.substitute_scoped(theta, tf, bound);
            }
            FormulaNode::Or(a, b) => {
                a.substitute_scoped(theta, tf, bound);
                b.substitute_scoped(theta, tf, bound);
            }
            FormulaNode::Exists(x, a) => {
                let added = bound.insert(*x);
                a.substitute_scoped(theta, tf, bound);
                if added {
                    bound.remove(x);
                }
            }
            FormulaNode::Bel {
                ante, conse, either, ..
            } => {
                ante.substitute_scoped(theta, tf, bound);
                conse.substitute_scoped(theta, tf, bound);
                either.substitute_scoped(theta, tf, bound);
            }
        }
    }

    /// Visit every subformula, children before parents, `self` last
    pub fn for_each_subformula(&self, f: &mut impl FnMut(&Formula)) {
        match &self.node {
            FormulaNode::Atomic(_) => {}
            FormulaNode::Not(a)
            | FormulaNode::Exists(_, a)
            | FormulaNode::Know(_, a)
            | FormulaNode::Cons(_, a)
            | FormulaNode::Guarantee(a) => a.for_each_subformula(f),
            FormulaNode::Or(a, b) => {
                a.for_each_subformula(f);
                b.for_each_subformula(f);
            }
            FormulaNode::Bel { ante, conse, .. } => {
                ante.for_each_subformula(f);
                conse.for_each_subformula(f);
            }
        }
        f(self);
    }

    /// Visit every clause in the tree
    pub fn for_each_clause(&self, f: &mut impl FnMut(&Clause)) {
        self.for_each_subformula(&mut |phi| {
            if let FormulaNode::Atomic(c) = &phi.node {
                f(c);
            }
        });
    }

    /// Visit every literal in the tree
    pub fn for_each_literal(&self, f: &mut impl FnMut(Literal)) {
        self.for_each_clause(&mut |c| {
            for &a in c.literals() {
                f(a);
            }
        });
    }

    /// No modal operator occurs
    pub fn objective(&self) -> bool {
        match &self.node {
            FormulaNode::Atomic(_) => true,
            FormulaNode::Not(a) | FormulaNode::Exists(_, a) | FormulaNode::Guarantee(a) => {
                a.objective()
            }
            FormulaNode::Or(a, b) => a.objective() && b.objective(),
            FormulaNode::Know(..) | FormulaNode::Cons(..) | FormulaNode::Bel { .. } => false,
        }
    }

    /// Every atom is rigid: no function symbol occurs outside a modal
    /// operator's scope
    pub fn subjective(&self) -> bool {
        match &self.node {
            FormulaNode::Atomic(c) => c
                .literals()
                .iter()
                .all(|a| !a.lhs().is_function() && !a.rhs().is_function()),
            FormulaNode::Not(a) | FormulaNode::Exists(_, a) | FormulaNode::Guarantee(a) => {
                a.subjective()
            }
            FormulaNode::Or(a, b) => a.subjective() && b.subjective(),
            FormulaNode::Know(..) | FormulaNode::Cons(..) | FormulaNode::Bel { .. } => true,
        }
    }

    /// Some modal operator has a free variable in its scope
    pub fn quantified_in(&self, tf: &TermFactory) -> bool {
        match &self.node {
            FormulaNode::Atomic(_) | FormulaNode::Not(_) => false,
            FormulaNode::Exists(_, a) | FormulaNode::Guarantee(a) => a.quantified_in(tf),
            FormulaNode::Or(a, b) => a.quantified_in(tf) || b.quantified_in(tf),
            FormulaNode::Know(..) | FormulaNode::Cons(..) | FormulaNode::Bel { .. } => {
                !self.free_vars(tf).is_empty()
            }
        }
    }

    pub fn trivially_valid(&self) -> bool {
        match &self.node {
            FormulaNode::Atomic(c) => c.valid(),
            FormulaNode::Not(a) => a.trivially_invalid(),
            FormulaNode::Or(a, b) => a.trivially_valid() || b.trivially_valid(),
            FormulaNode::Exists(_, a) | FormulaNode::Know(_, a) | FormulaNode::Guarantee(a) => {
                a.trivially_valid()
            }
            FormulaNode::Cons(..) => false,
            FormulaNode::Bel { either, .. } => either.trivially_valid(),
        }
    }

    pub fn trivially_invalid(&self) -> bool {
        match &self.node {
            FormulaNode::Atomic(c) => c.invalid(),
            FormulaNode::Not(a) => a.trivially_valid(),
            FormulaNode::Or(a, b) => a.trivially_invalid() && b.trivially_invalid(),
            FormulaNode::Exists(_, a) | FormulaNode::Cons(_, a) | FormulaNode::Guarantee(a) => {
                a.trivially_invalid()
            }
            FormulaNode::Know(..) | FormulaNode::Bel { .. } => false,
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            FormulaNode::Atomic(c) => write!(f, "[{}]", c),
            FormulaNode::Not(a) => write!(f, "¬{}", a),
            FormulaNode::Or(a, b) => write!(f, "({} ∨ {})", a, b),
            FormulaNode::Exists(x, a) => write!(f, "∃{}.{}", x, a),
            FormulaNode::Know(k, a) => write!(f, "K{}.{}", k, a),
            FormulaNode::Cons(k, a) => write!(f, "M{}.{}", k, a),
            FormulaNode::Bel { k, l, ante, conse, .. } => {
                write!(f, "B{},{}({} ⇒ {})", k, l, ante, conse)
            }
            FormulaNode::Guarantee(a) => write!(f, "G.{}", a),
        }
    }
}
