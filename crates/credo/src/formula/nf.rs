//! The normalization pipeline: rectify, normalize, flatten
//!
//! [`Formula::nf`] is clone → rectify → normalize → flatten → normalize.
//! Rectification renames bound variables so that every binder is unique
//! and disjoint from the free variables. Normalization pushes negations
//! inward, merges disjunctions of clauses where the quantifier prefix
//! parities allow it, and optionally distributes the modal operators over
//! clause structure. Flattening pulls non-primitive terms out of literals
//! by introducing fresh variables and inequalities, so that the result can
//! be recognized as a universally closed clause by
//! [`Formula::as_univ_clause`].

use super::{BeliefLevel, Formula, FormulaNode};
use crate::fol::{Clause, Literal, SymbolFactory, Term, TermFactory};
use indexmap::IndexSet;
use log::trace;
use std::cell::OnceCell;
use std::collections::HashMap;

/// A prefix of negations and existential binders peeled off a formula
#[derive(Debug, Clone, Default)]
pub struct QuantifierPrefix {
    elems: Vec<PrefixElem>,
}

#[derive(Debug, Clone)]
enum PrefixElem {
    Not,
    Exists(Term),
}

impl QuantifierPrefix {
    fn new() -> Self {
        QuantifierPrefix::default()
    }

    fn prepend_not(&mut self) {
        self.elems.insert(0, PrefixElem::Not);
    }

    fn append_not(&mut self) {
        self.elems.push(PrefixElem::Not);
    }

    fn append_exists(&mut self, x: Term) {
        self.elems.push(PrefixElem::Exists(x));
    }

    /// Is the number of negations in the prefix even?
    fn even(&self) -> bool {
        self.elems
            .iter()
            .filter(|e| matches!(e, PrefixElem::Not))
            .count()
            % 2
            == 0
    }

    /// Re-attach the prefix around `alpha`, outermost element first
    fn prepend_to(&self, mut alpha: Formula) -> Formula {
        for e in self.elems.iter().rev() {
            alpha = match e {
                PrefixElem::Not => Formula::not(alpha),
                PrefixElem::Exists(x) => Formula::exists(*x, alpha),
            };
        }
        alpha
    }
}

impl Formula {
    /// The full normal form: rectified, negation-normalized, flattened,
    /// and normalized once more.
    ///
    /// `distribute` additionally pushes `Know` and `Cons` inward over
    /// clause structure.
    pub fn nf(
        &self,
        sf: &mut SymbolFactory,
        tf: &mut TermFactory,
        distribute: bool,
    ) -> Formula {
        let mut phi = self.clone();
        phi.rectify(sf, tf);
        let phi = phi.normalize(tf, distribute);
        let phi = phi.flatten(0, sf, tf);
        phi.normalize(tf, distribute)
    }

    /// Rename bound variables in place so that no variable is bound by two
    /// binders or occurs both bound and free. Idempotent.
    pub fn rectify(&mut self, sf: &mut SymbolFactory, tf: &mut TermFactory) {
        let free: Vec<Term> = self.free_vars(tf).iter().collect();
        let mut seen: HashMap<Term, Term> = free.into_iter().map(|x| (x, x)).collect();
        self.rectify_scoped(&mut seen, sf, tf);
    }

    fn rectify_scoped(
        &mut self,
        seen: &mut HashMap<Term, Term>,
        sf: &mut SymbolFactory,
        tf: &mut TermFactory,
    ) {
        self.free_vars = OnceCell::new();
        match &mut self.node {
            FormulaNode::Atomic(c) => {
                *c = c.map_terms(tf, &mut |t| {
                    if t.is_variable() {
                        match seen.get(&t) {
                            Some(&u) if u != t => Some(u),
                            _ => None,
                        }
                    } else {
                        None
                    }
                });
            }
            FormulaNode::Not(a)
            | FormulaNode::Know(_, a)
            | FormulaNode::Cons(_, a)
            | FormulaNode::Guarantee(a) => a.rectify_scoped(seen, sf, tf),
            FormulaNode::Or(a, b) => {
                a.rectify_scoped(seen, sf, tf);
                b.rectify_scoped(seen, sf, tf);
            }
            FormulaNode::Exists(x, a) => {
                let old_x = *x;
                if seen.contains_key(&old_x) {
                    // Bound further left or free somewhere: this binder
                    // gets a fresh variable, scoped to its subtree.
                    let fresh = tf.fresh_var(old_x.sort(), sf);
                    let prev = seen.insert(old_x, fresh);
                    *x = fresh;
                    a.rectify_scoped(seen, sf, tf);
                    if let Some(prev) = prev {
                        seen.insert(old_x, prev);
                    }
                } else {
                    seen.insert(old_x, old_x);
                    a.rectify_scoped(seen, sf, tf);
                }
            }
            FormulaNode::Bel {
                ante, conse, either, ..
            } => {
                ante.rectify_scoped(seen, sf, tf);
                conse.rectify_scoped(seen, sf, tf);
                either.rectify_scoped(seen, sf, tf);
            }
        }
    }

    /// Peel the outer spine of negations and existential binders
    fn quantifier_prefix(&self) -> (QuantifierPrefix, &Formula) {
        let mut prefix = QuantifierPrefix::new();
        let mut strip = self;
        loop {
            match &strip.node {
                FormulaNode::Not(a) => {
                    prefix.append_not();
                    strip = a;
                }
                FormulaNode::Exists(x, a) => {
                    prefix.append_exists(*x);
                    strip = a;
                }
                _ => return (prefix, strip),
            }
        }
    }

    /// Push negations inward and merge clause-shaped disjuncts
    pub fn normalize(&self, tf: &TermFactory, distribute: bool) -> Formula {
        match &self.node {
            FormulaNode::Atomic(_) => self.clone(),
            FormulaNode::Not(alpha) => match &alpha.node {
                FormulaNode::Atomic(c) if c.unit() => {
                    Formula::atomic(Clause::unit_of(c.first().flip()))
                }
                FormulaNode::Atomic(_) => self.clone(),
                FormulaNode::Not(beta) => beta.normalize(tf, distribute),
                FormulaNode::Exists(x, beta) => {
                    Formula::not(Formula::exists(*x, beta.normalize(tf, distribute)))
                }
                _ => Formula::not(alpha.normalize(tf, distribute)),
            },
            FormulaNode::Or(lhs, rhs) => {
                let ln = lhs.normalize(tf, distribute);
                let rn = rhs.normalize(tf, distribute);
                let (mut lp, ls) = ln.quantifier_prefix();
                let (mut rp, rs) = rn.quantifier_prefix();
                let lc = match &ls.node {
                    FormulaNode::Atomic(c) if lp.even() || c.unit() => Some(c.clone()),
                    _ => None,
                };
                let rc = match &rs.node {
                    FormulaNode::Atomic(c) if rp.even() || c.unit() => Some(c.clone()),
                    _ => None,
                };
                match (lc, rc) {
                    (Some(mut lc), Some(mut rc)) => {
                        // An odd prefix flips the polarity of its clause;
                        // for a unit that is absorbed by flipping the
                        // literal and closing the prefix with another Not.
                        if !lp.even() {
                            lp.append_not();
                            lc = Clause::unit_of(lc.first().flip());
                        }
                        if !rp.even() {
                            rp.append_not();
                            rc = Clause::unit_of(rc.first().flip());
                        }
                        let mut lits = lc.literals().to_vec();
                        lits.extend_from_slice(rc.literals());
                        let joined = Formula::atomic(Clause::new(lits));
                        lp.prepend_to(rp.prepend_to(joined))
                    }
                    _ => Formula::or(ln, rn),
                }
            }
            FormulaNode::Exists(x, alpha) => {
                // An unused binder is dropped.
                if alpha.free_vars(tf).contains(*x) {
                    Formula::exists(*x, alpha.normalize(tf, distribute))
                } else {
                    alpha.normalize(tf, distribute)
                }
            }
            FormulaNode::Know(k, alpha) => {
                let alpha = alpha.normalize(tf, distribute);
                if distribute {
                    dist_k(*k, alpha)
                } else {
                    Formula::know(*k, alpha)
                }
            }
            FormulaNode::Cons(k, alpha) => {
                let alpha = alpha.normalize(tf, distribute);
                if distribute {
                    dist_m(*k, alpha)
                } else {
                    Formula::cons(*k, alpha)
                }
            }
            FormulaNode::Bel {
                k,
                l,
                ante,
                conse,
                either,
            } => Formula::bel_with_either(
                *k,
                *l,
                ante.normalize(tf, distribute),
                conse.normalize(tf, distribute),
                either.normalize(tf, distribute),
            ),
            FormulaNode::Guarantee(alpha) => {
                Formula::guarantee(alpha.normalize(tf, distribute))
            }
        }
    }

    /// Pull non-primitive terms out of literals.
    ///
    /// `nots` counts the negations passed on the way down; an even count
    /// means the introduced binders read universally once the surrounding
    /// Not is attached. Know, Cons, and Bel reset the count for their
    /// arguments.
    fn flatten(&self, nots: usize, sf: &mut SymbolFactory, tf: &mut TermFactory) -> Formula {
        match &self.node {
            FormulaNode::Atomic(_) => self.flatten_atomic(nots, sf, tf),
            FormulaNode::Not(a) => Formula::not(a.flatten(nots + 1, sf, tf)),
            FormulaNode::Or(a, b) => {
                Formula::or(a.flatten(nots, sf, tf), b.flatten(nots, sf, tf))
            }
            FormulaNode::Exists(x, a) => Formula::exists(*x, a.flatten(nots, sf, tf)),
            FormulaNode::Know(k, a) => Formula::know(*k, a.flatten(0, sf, tf)),
            FormulaNode::Cons(k, a) => Formula::cons(*k, a.flatten(0, sf, tf)),
            FormulaNode::Bel {
                k,
                l,
                ante,
                conse,
                either,
            } => Formula::bel_with_either(
                *k,
                *l,
                ante.flatten(0, sf, tf),
                conse.flatten(0, sf, tf),
                either.flatten(0, sf, tf),
            ),
            FormulaNode::Guarantee(a) => Formula::guarantee(a.flatten(nots, sf, tf)),
        }
    }

    // For x1 ... xN not occurring in t1 ... tN, the following are
    // equivalent:
    //   (1)  Fa x1 ... Fa xN (t1 ≠ x1 ∨ ... ∨ tN ≠ xN ∨ c)
    //   (2)  Ex x1 ... Ex xN (t1 = x1 ∧ ... ∧ tN = xN ∧ c)
    // Form (1) is generated here; it is the bigger clause and thus the
    // stronger handle for the setup. Under an odd number of enclosing
    // negations the result reads as (2); for a unit clause the clausal
    // structure is saved anyway by flipping the literal first and
    // accounting for that with one more negation.
    fn flatten_atomic(
        &self,
        nots: usize,
        sf: &mut SymbolFactory,
        tf: &mut TermFactory,
    ) -> Formula {
        let c = match &self.node {
            FormulaNode::Atomic(c) => c,
            _ => unreachable!("flatten_atomic on a non-atomic formula"),
        };
        let add_double_negation = nots % 2 == 1 && c.unit();
        let start = if add_double_negation {
            Clause::unit_of(c.first().flip())
        } else {
            c.clone()
        };

        let mut queue: IndexSet<Literal> = start.literals().iter().copied().collect();
        let mut term_to_var: HashMap<Term, Term> = HashMap::new();
        // Literals of the form f(...) ≠ x already fix the variable that
        // stands for the application; reusing them is what ties the two
        // halves of a flattening step together.
        for &a in &queue {
            if !a.pos() && a.lhs().is_function() && a.rhs().is_variable() {
                term_to_var.insert(a.lhs(), a.rhs());
            }
        }

        let mut lits: Vec<Literal> = Vec::new();
        let mut vars: Vec<Term> = Vec::new();
        while let Some(a) = queue.pop() {
            if a.function_free(tf) || (a.quasiprimitive(tf) && a.rhs().is_variable()) {
                lits.push(a);
            } else if a.rhs().is_function() && (!a.pos() || queue.iter().all(|b| b.pos())) {
                // Both sides are applications; detach the smaller one.
                let old_t = if a.lhs().arity() < a.rhs().arity() {
                    a.lhs()
                } else {
                    a.rhs()
                };
                let new_t = var_for(old_t, &mut term_to_var, &mut vars, sf, tf);
                queue.insert(a.replace(tf, old_t, new_t));
                queue.insert(Literal::neq(new_t, old_t));
            } else if let Some(old_arg) =
                tf.args(a.lhs()).iter().copied().find(|t| t.is_function())
            {
                // A nested application argument is detached first.
                let new_arg = var_for(old_arg, &mut term_to_var, &mut vars, sf, tf);
                queue.insert(a.replace(tf, old_arg, new_arg));
                queue.insert(Literal::neq(new_arg, old_arg));
            } else if !a.pos() || queue.iter().all(|b| b.pos()) {
                // A quasiprimitive application against a name: detach the
                // application itself.
                debug_assert!(a.lhs().is_function() && a.rhs().is_name());
                let old_t = a.lhs();
                let new_t = var_for(old_t, &mut term_to_var, &mut vars, sf, tf);
                queue.insert(a.replace(tf, old_t, new_t));
                queue.insert(Literal::neq(new_t, old_t));
            } else {
                // Mixed polarities block the rewrite; keep the literal.
                lits.push(a);
            }
        }

        if vars.is_empty() {
            return self.clone();
        }
        let mut prefix = QuantifierPrefix::new();
        for &x in &vars {
            prefix.append_exists(x);
        }
        if !add_double_negation {
            prefix.prepend_not();
        }
        prefix.append_not();
        prefix.prepend_to(Formula::atomic(Clause::new(lits)))
    }

    /// Recognize a formula that is a single universally closed clause.
    ///
    /// Matches atomic clauses of quasiprimitive or function-free literals
    /// at even polarity, disjunctions of two such, and existential binders
    /// at odd polarity. Modal operators are never representable.
    pub fn as_univ_clause(&self, tf: &TermFactory) -> Option<Clause> {
        self.univ_clause_at(0, tf)
    }

    fn univ_clause_at(&self, nots: usize, tf: &TermFactory) -> Option<Clause> {
        match &self.node {
            FormulaNode::Atomic(c) => {
                if nots % 2 != 0 {
                    return None;
                }
                let flat = c
                    .literals()
                    .iter()
                    .all(|a| a.quasiprimitive(tf) || a.function_free(tf));
                if flat {
                    Some(c.clone())
                } else {
                    None
                }
            }
            FormulaNode::Or(l, r) => {
                if nots % 2 != 0 {
                    return None;
                }
                let lc = l.univ_clause_at(nots, tf)?;
                let rc = r.univ_clause_at(nots, tf)?;
                let mut lits = lc.literals().to_vec();
                lits.extend_from_slice(rc.literals());
                Some(Clause::new(lits))
            }
            FormulaNode::Exists(_, a) => {
                if nots % 2 == 0 {
                    None
                } else {
                    a.univ_clause_at(nots, tf)
                }
            }
            FormulaNode::Not(a) => a.univ_clause_at(nots + 1, tf),
            _ => None,
        }
    }
}

fn var_for(
    old_t: Term,
    term_to_var: &mut HashMap<Term, Term>,
    vars: &mut Vec<Term>,
    sf: &mut SymbolFactory,
    tf: &mut TermFactory,
) -> Term {
    if let Some(&x) = term_to_var.get(&old_t) {
        return x;
    }
    let x = tf.fresh_var(old_t.sort(), sf);
    term_to_var.insert(old_t, x);
    vars.push(x);
    trace!("flattening introduces {} for {}", x, old_t);
    x
}

// DistK pushes Know through a negated formula: over a negated clause it
// splits into per-literal knowledge, over Or and Exists it commutes in De
// Morgan form.
fn dist_k(k: BeliefLevel, alpha: Formula) -> Formula {
    if let FormulaNode::Not(beta) = &alpha.node {
        match &beta.node {
            FormulaNode::Atomic(c) if c.len() == 1 => {
                return Formula::know(k, Formula::atomic(Clause::unit_of(c.first().flip())));
            }
            FormulaNode::Atomic(c) if c.len() >= 2 => {
                let mut gamma: Option<Formula> = None;
                for &a in c.literals() {
                    let delta = Formula::know(k, Formula::atomic(Clause::unit_of(a.flip())));
                    gamma = Some(match gamma {
                        None => delta,
                        Some(g) => Formula::or(g, delta),
                    });
                }
                return Formula::not(gamma.expect("non-empty clause"));
            }
            FormulaNode::Not(gamma) => return dist_k(k, (**gamma).clone()),
            FormulaNode::Or(l, r) => {
                return Formula::not(Formula::or(
                    Formula::not(dist_k(k, Formula::not((**l).clone()))),
                    Formula::not(dist_k(k, Formula::not((**r).clone()))),
                ));
            }
            FormulaNode::Exists(x, gamma) => {
                return Formula::not(Formula::exists(
                    *x,
                    Formula::not(dist_k(k, Formula::not((**gamma).clone()))),
                ));
            }
            _ => {}
        }
    }
    Formula::know(k, alpha)
}

// DistM pushes Cons inward: over Or it splits, through Exists it commutes,
// and a clause of two or more literals becomes the disjunction of knowing
// some literal's complement to fail.
fn dist_m(k: BeliefLevel, alpha: Formula) -> Formula {
    match &alpha.node {
        FormulaNode::Atomic(c) if c.len() >= 2 => {
            let mut gamma: Option<Formula> = None;
            for &a in c.literals() {
                let delta = Formula::know(k, Formula::atomic(Clause::unit_of(a.flip())));
                gamma = Some(match gamma {
                    None => delta,
                    Some(g) => Formula::or(g, delta),
                });
            }
            gamma.expect("non-empty clause")
        }
        FormulaNode::Or(l, r) => Formula::or(dist_m(k, (**l).clone()), dist_m(k, (**r).clone())),
        FormulaNode::Exists(x, gamma) => Formula::exists(*x, dist_m(k, (**gamma).clone())),
        _ => Formula::cons(k, alpha),
    }
}
