//! Clauses: sorted, duplicate-free disjunctions of literals

use super::bloom::BloomSet;
use super::literal::Literal;
use super::term::{Term, TermFactory};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of probing the unit set against one clause literal
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnitProbe {
    /// No unit constrains the literal
    None,
    /// Some unit is complementary to the literal; it is falsified
    Complementary,
    /// Some unit subsumes the literal; the whole clause is satisfied
    Subsuming,
}

/// A clause. Literals are kept sorted (left-term-major) with duplicates
/// and trivially-false literals removed at construction. The empty clause
/// is ⊥.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    lits: Vec<Literal>,
    bloom: BloomSet,
}

impl Clause {
    /// Normalize a literal sequence into a clause.
    ///
    /// Trivially-false literals contribute nothing to a disjunction and
    /// are dropped; the rest is sorted and deduplicated.
    pub fn new(mut lits: Vec<Literal>) -> Self {
        lits.retain(|a| !a.invalid());
        lits.sort();
        lits.dedup();
        Clause::from_normal(lits)
    }

    /// The empty clause ⊥
    pub fn empty() -> Self {
        Clause::from_normal(Vec::new())
    }

    /// A unit clause
    pub fn unit_of(a: Literal) -> Self {
        Clause::new(vec![a])
    }

    fn from_normal(lits: Vec<Literal>) -> Self {
        let mut bloom = BloomSet::new();
        for a in &lits {
            bloom.add(a.lhs());
        }
        Clause { lits, bloom }
    }

    pub fn literals(&self) -> &[Literal] {
        &self.lits
    }

    pub fn len(&self) -> usize {
        self.lits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }

    /// An empty clause is unsatisfiable
    pub fn invalid(&self) -> bool {
        self.lits.is_empty()
    }

    /// Exactly one literal
    pub fn unit(&self) -> bool {
        self.lits.len() == 1
    }

    pub fn first(&self) -> Literal {
        self.lits[0]
    }

    pub fn last(&self) -> Literal {
        self.lits[self.lits.len() - 1]
    }

    /// Bloom summary of the left-hand-side terms
    pub fn lhs_bloom(&self) -> BloomSet {
        self.bloom
    }

    /// Trivially true: contains a valid literal or a pair whose
    /// disjunction is exhaustive
    pub fn valid(&self) -> bool {
        if self.lits.iter().any(|a| a.valid()) {
            return true;
        }
        // A valid pair shares its left term, and same-lhs literals are
        // adjacent after sorting.
        let mut run = 0;
        while run < self.lits.len() {
            let lhs = self.lits[run].lhs();
            let mut end = run + 1;
            while end < self.lits.len() && self.lits[end].lhs() == lhs {
                end += 1;
            }
            for i in run..end {
                for j in (i + 1)..end {
                    if Literal::valid_pair(self.lits[i], self.lits[j]) {
                        return true;
                    }
                }
            }
            run = end;
        }
        false
    }

    /// All literals are primitive, or equalities between non-function terms
    pub fn primitive(&self, tf: &TermFactory) -> bool {
        self.lits.iter().all(|a| {
            a.primitive(tf) || (!a.lhs().is_function() && !a.rhs().is_function())
        })
    }

    /// All literals are ground
    pub fn ground(&self, tf: &TermFactory) -> bool {
        self.lits
            .iter()
            .all(|a| tf.ground(a.lhs()) && tf.ground(a.rhs()))
    }

    /// Does some literal of this clause get subsumed by `a`?
    ///
    /// Binary search narrows to the run of literals sharing `a`'s left
    /// term; only those can be subsumed by it.
    pub fn some_literal_subsumed_by(&self, a: Literal) -> bool {
        let start = self.lits.partition_point(|b| b.lhs() < a.lhs());
        self.lits[start..]
            .iter()
            .take_while(|b| b.lhs() == a.lhs())
            .any(|&b| a.subsumes(b))
    }

    /// Clause subsumption: every literal of `self` subsumes some literal
    /// of `other`, making `other` true in every model of `self`.
    pub fn subsumes(&self, other: &Clause) -> bool {
        if !self.bloom.possibly_subset_of(other.bloom) {
            return false;
        }
        self.lits.iter().all(|&a| other.some_literal_subsumed_by(a))
    }

    /// Unit-propagate through the clause.
    ///
    /// `probe` reports how the unit set constrains each literal. Falsified
    /// literals are removed; a subsumed literal makes the whole clause
    /// satisfied, reported as `None`.
    pub fn propagate_units(&self, mut probe: impl FnMut(Literal) -> UnitProbe) -> Option<Clause> {
        let mut lits = Vec::with_capacity(self.lits.len());
        for &a in &self.lits {
            match probe(a) {
                UnitProbe::Subsuming => return None,
                UnitProbe::Complementary => {}
                UnitProbe::None => lits.push(a),
            }
        }
        // The survivors are a sorted subsequence already.
        Some(Clause::from_normal(lits))
    }

    /// Rebuild every literal under a partial term map and renormalize
    pub fn map_terms(
        &self,
        tf: &mut TermFactory,
        theta: &mut impl FnMut(Term) -> Option<Term>,
    ) -> Clause {
        Clause::new(
            self.lits
                .iter()
                .map(|a| a.map_terms(tf, theta))
                .collect(),
        )
    }

    /// Collect the variables occurring anywhere in the clause
    pub fn collect_variables(&self, tf: &TermFactory, out: &mut Vec<Term>) {
        for a in &self.lits {
            tf.collect_variables(a.lhs(), out);
            tf.collect_variables(a.rhs(), out);
        }
    }

    /// Format with full term structure
    pub fn display<'a>(&'a self, tf: &'a TermFactory) -> ClauseDisplay<'a> {
        ClauseDisplay { clause: self, factory: tf }
    }
}

/// Display wrapper that resolves term structure through the factory
pub struct ClauseDisplay<'a> {
    clause: &'a Clause,
    factory: &'a TermFactory,
}

impl fmt::Display for ClauseDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clause.is_empty() {
            return write!(f, "⊥");
        }
        for (i, &a) in self.clause.literals().iter().enumerate() {
            if i > 0 {
                write!(f, " ∨ ")?;
            }
            write!(f, "{}", a.display(self.factory))?;
        }
        Ok(())
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "⊥");
        }
        for (i, a) in self.lits.iter().enumerate() {
            if i > 0 {
                write!(f, " ∨ ")?;
            }
            write!(f, "{}", a)?;
        }
        Ok(())
    }
}
