//! Setups: stores of ground primitive clauses used as local theories
//!
//! A setup is populated through [`Setup::add_clause`], closed under unit
//! propagation as it grows, minimized under subsumption by
//! [`Setup::minimize`], and then queried with [`Setup::subsumes`],
//! [`Setup::consistent`], and [`Setup::locally_consistent`]. All three
//! queries are sound but incomplete.
//!
//! Query evaluation branches on hypothetical units through
//! [`Setup::shallow_copy`], a scope token that records the store sizes on
//! creation and truncates back on drop. While a copy is live the parent
//! cannot be touched; the borrow checker enforces the one-live-copy
//! contract at compile time.
//!
//! Inconsistency is a value, not an error: deriving ⊥ sets a flag that
//! makes every later `subsumes` trivially true and every consistency test
//! trivially false.

use crate::fol::{BloomSet, Clause, Literal, Term, UnitProbe};
use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use std::ops::{Deref, Range};

/// Result of adding a clause or unit to a setup
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddResult {
    /// Stored (or absorbed into the unit set)
    Ok,
    /// Already entailed; nothing was stored
    Subsumed,
    /// The addition derived the empty clause
    Inconsistent,
}

/// The set of asserted unit literals.
///
/// Kept both as a vector in insertion order and as a hash map keyed by the
/// left-hand term, whose buckets hold every unit over that term. After
/// [`UnitStore::seal`] the vector is sorted and the stable prefix is probed
/// by binary search instead of hashing; units added after sealing go to the
/// hash map as usual.
#[derive(Debug, Clone, Default)]
pub struct UnitStore {
    vec: Vec<Literal>,
    set: HashMap<Term, Vec<Literal>>,
    n_sealed: usize,
}

impl UnitStore {
    pub fn new() -> Self {
        UnitStore::default()
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn literals(&self) -> &[Literal] {
        &self.vec
    }

    pub fn sealed(&self) -> bool {
        self.n_sealed > 0
    }

    fn same_lhs(&self, t: Term) -> impl Iterator<Item = Literal> + '_ {
        let prefix = &self.vec[..self.n_sealed];
        let start = prefix.partition_point(|u| u.lhs() < t);
        prefix[start..]
            .iter()
            .take_while(move |u| u.lhs() == t)
            .copied()
            .chain(self.set.get(&t).into_iter().flatten().copied())
    }

    /// How does the unit set constrain literal `a`?
    pub fn probe(&self, a: Literal) -> UnitProbe {
        for u in self.same_lhs(a.lhs()) {
            if u.subsumes(a) {
                return UnitProbe::Subsuming;
            }
            if Literal::complementary(u, a) {
                return UnitProbe::Complementary;
            }
        }
        UnitProbe::None
    }

    /// Add a unit literal.
    ///
    /// `Inconsistent` if a stored unit is complementary to `a`, `Subsumed`
    /// if a stored unit entails it, `Ok` once stored.
    pub fn add(&mut self, a: Literal) -> AddResult {
        for u in self.same_lhs(a.lhs()) {
            if Literal::complementary(u, a) {
                return AddResult::Inconsistent;
            }
            if u.subsumes(a) {
                return AddResult::Subsumed;
            }
        }
        self.vec.push(a);
        self.set.entry(a.lhs()).or_default().push(a);
        AddResult::Ok
    }

    /// Is there a positive unit with left term `t`?
    pub fn determines(&self, t: Term) -> bool {
        self.same_lhs(t).any(|u| u.pos())
    }

    /// Sort and deduplicate the vector, record it as the stable prefix,
    /// and empty the hash map. Probes on the prefix use binary search from
    /// here on.
    pub fn seal(&mut self) {
        self.vec.sort();
        self.vec.dedup();
        self.n_sealed = self.vec.len();
        self.set.clear();
    }

    /// Re-insert the sealed prefix into the hash map
    pub fn unseal(&mut self) {
        if self.n_sealed == 0 {
            return;
        }
        for i in 0..self.n_sealed {
            let a = self.vec[i];
            self.set.entry(a.lhs()).or_default().push(a);
        }
        self.n_sealed = 0;
    }

    /// Drop every unit past the first `n`, maintaining the hash map
    pub fn truncate(&mut self, n: usize) {
        debug_assert!(n >= self.n_sealed);
        while self.vec.len() > n {
            let a = self.vec.pop().unwrap();
            if let Some(bucket) = self.set.get_mut(&a.lhs()) {
                if let Some(pos) = bucket.iter().position(|&u| u == a) {
                    bucket.swap_remove(pos);
                }
                if bucket.is_empty() {
                    self.set.remove(&a.lhs());
                }
            }
        }
    }

    /// Take every unit out, leaving the store empty and unsealed
    fn drain(&mut self) -> Vec<Literal> {
        self.set.clear();
        self.n_sealed = 0;
        std::mem::take(&mut self.vec)
    }

    fn clear(&mut self) {
        self.vec.clear();
        self.set.clear();
        self.n_sealed = 0;
    }
}

/// A populated clause store used as a local theory.
///
/// Owns its clauses and units by value; the stored clauses are kept in
/// parallel with a watched pair of their literals that prefilters unit
/// propagation and subsumption candidates.
#[derive(Debug, Clone, Default)]
pub struct Setup {
    empty_clause: bool,
    units: UnitStore,
    clauses: Vec<Clause>,
    watches: Vec<(Literal, Literal)>,
}

impl Setup {
    pub fn new() -> Self {
        Setup::default()
    }

    /// Has the empty clause been derived?
    pub fn contains_empty_clause(&self) -> bool {
        self.empty_clause
    }

    /// Add a clause, propagating units and indexing the residual.
    ///
    /// Unseals the unit store first: adding clauses re-opens the
    /// population phase until the next [`Setup::minimize`].
    pub fn add_clause(&mut self, c: &Clause) -> AddResult {
        if self.empty_clause {
            return AddResult::Inconsistent;
        }
        self.units.unseal();
        if c.valid() {
            return AddResult::Subsumed;
        }
        let residual = {
            let units = &self.units;
            c.propagate_units(|a| units.probe(a))
        };
        let d = match residual {
            None => return AddResult::Subsumed,
            Some(d) => d,
        };
        if d.invalid() {
            debug!("clause {} reduced to ⊥", c);
            self.empty_clause = true;
            return AddResult::Inconsistent;
        }
        if d.unit() {
            return self.add_unit(d.first());
        }
        trace!("storing clause {}", d);
        self.watches.push((d.first(), d.last()));
        self.clauses.push(d);
        AddResult::Ok
    }

    /// Add a unit literal and run unit propagation to a fixpoint.
    ///
    /// Unlike [`Setup::add_clause`] this does not unseal the unit store,
    /// so it is cheap inside query-time shallow copies.
    pub fn add_unit(&mut self, a: Literal) -> AddResult {
        if self.empty_clause {
            return AddResult::Inconsistent;
        }
        if a.valid() {
            return AddResult::Subsumed;
        }
        if a.invalid() {
            self.empty_clause = true;
            return AddResult::Inconsistent;
        }
        match self.units.add(a) {
            AddResult::Inconsistent => {
                debug!("unit {} clashes with the unit set", a);
                self.empty_clause = true;
                return AddResult::Inconsistent;
            }
            AddResult::Subsumed => return AddResult::Subsumed,
            AddResult::Ok => {}
        }
        self.propagate(self.units.len() - 1);
        if self.empty_clause {
            AddResult::Inconsistent
        } else {
            AddResult::Ok
        }
    }

    // Cursor-driven propagation: every unit from `cursor` on is pushed
    // through the clause store; clauses shrinking to units enqueue more
    // work by extending the unit vector.
    fn propagate(&mut self, mut cursor: usize) {
        while cursor < self.units.len() && !self.empty_clause {
            let u = self.units.literals()[cursor];
            cursor += 1;
            trace!("propagating unit {}", u);
            for i in 0..self.clauses.len() {
                let (wa, wb) = self.watches[i];
                if !Literal::complementary(u, wa) && !Literal::complementary(u, wb) {
                    continue;
                }
                let residual = {
                    let units = &self.units;
                    self.clauses[i].propagate_units(|a| units.probe(a))
                };
                match residual {
                    None => {}
                    Some(d) if d.invalid() => {
                        debug!("unit propagation derived ⊥");
                        self.empty_clause = true;
                        return;
                    }
                    Some(d) if d.unit() => {
                        if self.units.add(d.first()) == AddResult::Inconsistent {
                            self.empty_clause = true;
                            return;
                        }
                    }
                    Some(d) => {
                        self.watches[i] = (d.first(), d.last());
                    }
                }
            }
        }
    }

    /// Offline minimization pass, run once after population.
    ///
    /// Re-adds negative units so that positive units absorb entailed ones,
    /// sweeps the clause store back to front dropping subsumed clauses,
    /// and seals the unit store. Idempotent.
    pub fn minimize(&mut self) {
        if self.empty_clause {
            self.units.clear();
            self.clauses.clear();
            self.watches.clear();
            return;
        }
        let (pos, neg): (Vec<_>, Vec<_>) = self.units.drain().into_iter().partition(|a| a.pos());
        for a in pos {
            let r = self.units.add(a);
            debug_assert_ne!(r, AddResult::Inconsistent);
        }
        for a in neg {
            let r = self.units.add(a);
            debug_assert_ne!(r, AddResult::Inconsistent);
            if r == AddResult::Subsumed {
                trace!("negative unit {} absorbed", a);
            }
        }
        let mut i = self.clauses.len();
        while i > 0 {
            i -= 1;
            let clause = self.clauses.remove(i);
            self.watches.remove(i);
            let residual = {
                let units = &self.units;
                clause.propagate_units(|a| units.probe(a))
            };
            let keep = match residual {
                None => None,
                Some(d) if d.invalid() => {
                    self.empty_clause = true;
                    self.minimize();
                    return;
                }
                Some(d) if d.unit() => {
                    if self.units.add(d.first()) == AddResult::Inconsistent {
                        self.empty_clause = true;
                        self.minimize();
                        return;
                    }
                    None
                }
                Some(d) => {
                    if self.clauses.iter().any(|c| c.subsumes(&d)) {
                        debug!("dropping subsumed clause {}", d);
                        None
                    } else {
                        Some(d)
                    }
                }
            };
            if let Some(d) = keep {
                self.watches.insert(i, (d.first(), d.last()));
                self.clauses.insert(i, d);
            }
        }
        self.units.seal();
    }

    /// Does every model of the setup satisfy `d`?
    ///
    /// Sound but incomplete: structural subsumption after unit
    /// propagation.
    pub fn subsumes(&self, d: &Clause) -> bool {
        if self.empty_clause || d.valid() {
            return true;
        }
        if d.is_empty() {
            return self.empty_clause;
        }
        if d.literals()
            .iter()
            .any(|&b| self.units.probe(b) == UnitProbe::Subsuming)
        {
            return true;
        }
        // A positive unit can only be entailed by literal-wise equal
        // literals, so no non-unit clause subsumes it.
        if d.unit() && d.first().pos() {
            return false;
        }
        for i in 0..self.clauses.len() {
            let (wa, wb) = self.watches[i];
            if !d.some_literal_subsumed_by(wa) || !d.some_literal_subsumed_by(wb) {
                continue;
            }
            let residual = {
                let units = &self.units;
                self.clauses[i].propagate_units(|a| units.probe(a))
            };
            if let Some(c) = residual {
                if c.subsumes(d) {
                    return true;
                }
            }
        }
        false
    }

    /// Sound-but-incomplete global consistency test: no two complementary
    /// literals anywhere in the store share a left term.
    pub fn consistent(&self) -> bool {
        if self.empty_clause {
            return false;
        }
        let mut buckets: HashMap<Term, Vec<Literal>> = HashMap::new();
        for &u in self.units.literals() {
            buckets.entry(u.lhs()).or_default().push(u);
        }
        for c in &self.clauses {
            for &a in c.literals() {
                buckets.entry(a.lhs()).or_default().push(a);
            }
        }
        consistent_buckets(&buckets)
    }

    /// [`Setup::consistent`] restricted to clauses whose left-hand terms
    /// overlap `ts`, prefiltered by Bloom intersection.
    pub fn locally_consistent(&self, ts: &[Term]) -> bool {
        if self.empty_clause {
            return false;
        }
        let set: HashSet<Term> = ts.iter().copied().collect();
        let mut bloom = BloomSet::new();
        for &t in &set {
            bloom.add(t);
        }
        let mut buckets: HashMap<Term, Vec<Literal>> = HashMap::new();
        for &u in self.units.literals() {
            if set.contains(&u.lhs()) {
                buckets.entry(u.lhs()).or_default().push(u);
            }
        }
        for c in &self.clauses {
            if !c.lhs_bloom().possibly_overlaps(bloom) {
                continue;
            }
            if !c.literals().iter().any(|a| set.contains(&a.lhs())) {
                continue;
            }
            for &a in c.literals() {
                buckets.entry(a.lhs()).or_default().push(a);
            }
        }
        consistent_buckets(&buckets)
    }

    /// Is there a positive unit with left term `t`?
    pub fn determines(&self, t: Term) -> bool {
        self.units.determines(t)
    }

    /// The asserted unit literals, in store order
    pub fn units(&self) -> &[Literal] {
        self.units.literals()
    }

    /// Index range of the materializable clauses.
    ///
    /// When the empty clause has been derived there is exactly one,
    /// distinguished slot; otherwise the unit band comes first, then the
    /// stored clauses.
    pub fn clauses(&self) -> Range<usize> {
        if self.empty_clause {
            0..1
        } else {
            0..self.units.len() + self.clauses.len()
        }
    }

    /// Materialize the clause at index `i` of [`Setup::clauses`]
    pub fn clause(&self, i: usize) -> Clause {
        if self.empty_clause {
            debug_assert_eq!(i, 0);
            return Clause::empty();
        }
        if i < self.units.len() {
            return Clause::unit_of(self.units.literals()[i]);
        }
        let stored = &self.clauses[i - self.units.len()];
        let units = &self.units;
        stored
            .propagate_units(|a| units.probe(a))
            .unwrap_or_else(|| stored.clone())
    }

    /// Take a scope token for hypothetical reasoning.
    ///
    /// The token allows `add_unit` (only) and restores the setup on drop.
    /// Holding it borrows the setup mutably, so no other mutation can
    /// happen while it is live.
    pub fn shallow_copy(&mut self) -> ShallowCopy<'_> {
        ShallowCopy {
            empty_clause: self.empty_clause,
            n_units: self.units.len(),
            n_clauses: self.clauses.len(),
            watches: self.watches.clone(),
            setup: self,
        }
    }
}

fn consistent_buckets(buckets: &HashMap<Term, Vec<Literal>>) -> bool {
    for bucket in buckets.values() {
        for (i, &a) in bucket.iter().enumerate() {
            for &b in &bucket[i + 1..] {
                if Literal::complementary(a, b) {
                    return false;
                }
            }
        }
    }
    true
}

/// Scope token recording a setup's append-only state.
///
/// Created by [`Setup::shallow_copy`]. Supports `add_unit` and, through
/// `Deref`, every query; dropping it truncates the unit and clause stores
/// back and restores the watched pairs and the empty-clause flag, leaving
/// the parent bit-for-bit as it was.
#[derive(Debug)]
pub struct ShallowCopy<'a> {
    setup: &'a mut Setup,
    empty_clause: bool,
    n_units: usize,
    n_clauses: usize,
    watches: Vec<(Literal, Literal)>,
}

impl ShallowCopy<'_> {
    /// Add a hypothetical unit; undone when the copy is dropped
    pub fn add_unit(&mut self, a: Literal) -> AddResult {
        self.setup.add_unit(a)
    }
}

impl Deref for ShallowCopy<'_> {
    type Target = Setup;

    fn deref(&self) -> &Setup {
        self.setup
    }
}

impl Drop for ShallowCopy<'_> {
    fn drop(&mut self) {
        self.setup.units.truncate(self.n_units);
        self.setup.clauses.truncate(self.n_clauses);
        self.setup.watches = std::mem::take(&mut self.watches);
        self.setup.empty_clause = self.empty_clause;
    }
}
