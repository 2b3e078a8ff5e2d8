//! Literals: signed equalities between terms
//!
//! A literal is `lhs = rhs` or `lhs ≠ rhs`, stored canonically with the
//! function side on the left. Complementarity and subsumption are the
//! ground comparison rules the setup propagates with: two names are equal
//! iff they are the same name.

use super::term::{Term, TermFactory};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A signed equality. `pos` selects `=` over `≠`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    pos: bool,
    lhs: Term,
    rhs: Term,
}

impl Literal {
    /// Create an equality literal `lhs = rhs`
    pub fn eq(lhs: Term, rhs: Term) -> Self {
        Literal::new(true, lhs, rhs)
    }

    /// Create an inequality literal `lhs ≠ rhs`
    pub fn neq(lhs: Term, rhs: Term) -> Self {
        Literal::new(false, lhs, rhs)
    }

    fn new(pos: bool, mut lhs: Term, mut rhs: Term) -> Self {
        // Canonical form keeps the heavier side left: a function
        // application never sits on the right of a non-function term.
        if !lhs.is_function() && rhs.is_function() {
            std::mem::swap(&mut lhs, &mut rhs);
        }
        Literal { pos, lhs, rhs }
    }

    pub fn pos(self) -> bool {
        self.pos
    }

    pub fn lhs(self) -> Term {
        self.lhs
    }

    pub fn rhs(self) -> Term {
        self.rhs
    }

    /// Toggle the sign
    pub fn flip(self) -> Self {
        Literal {
            pos: !self.pos,
            ..self
        }
    }

    /// Trivially true: `t = t`, or `n ≠ m` for distinct names
    pub fn valid(self) -> bool {
        if self.pos {
            self.lhs == self.rhs
        } else {
            self.lhs.is_name() && self.rhs.is_name() && self.lhs != self.rhs
        }
    }

    /// Trivially false: `t ≠ t`, or `n = m` for distinct names
    pub fn invalid(self) -> bool {
        if self.pos {
            self.lhs.is_name() && self.rhs.is_name() && self.lhs != self.rhs
        } else {
            self.lhs == self.rhs
        }
    }

    /// Are `a` and `b` jointly unsatisfiable?
    ///
    /// Same left term and either identical sides with opposite signs, or
    /// two positive equalities against distinct names.
    pub fn complementary(a: Literal, b: Literal) -> bool {
        a.lhs == b.lhs
            && ((a.rhs == b.rhs && a.pos != b.pos)
                || (a.pos
                    && b.pos
                    && a.rhs.is_name()
                    && b.rhs.is_name()
                    && a.rhs != b.rhs))
    }

    /// Is the disjunction `a ∨ b` trivially true?
    ///
    /// Same left term and either identical sides with opposite signs, or
    /// two inequalities against distinct names (the term cannot differ
    /// from every name).
    pub fn valid_pair(a: Literal, b: Literal) -> bool {
        a.lhs == b.lhs
            && ((a.rhs == b.rhs && a.pos != b.pos)
                || (!a.pos
                    && !b.pos
                    && a.rhs.is_name()
                    && b.rhs.is_name()
                    && a.rhs != b.rhs))
    }

    /// Does `self` entail `other`?
    ///
    /// Holds for identical literals, and for `s = n` entailing `s ≠ m`
    /// when `n`, `m` are distinct names.
    pub fn subsumes(self, other: Literal) -> bool {
        self.lhs == other.lhs
            && ((self.pos == other.pos && self.rhs == other.rhs)
                || (self.pos
                    && !other.pos
                    && self.rhs.is_name()
                    && other.rhs.is_name()
                    && self.rhs != other.rhs))
    }

    /// Primitive: a function application over names and variables on the
    /// left, a name or variable on the right.
    pub fn primitive(self, tf: &TermFactory) -> bool {
        tf.primitive(self.lhs) && (self.rhs.is_name() || self.rhs.is_variable())
    }

    /// Quasiprimitive: a function application over names and variables on
    /// the left, a name or variable on the right. Weaker than primitive in
    /// that variables may appear as arguments.
    pub fn quasiprimitive(self, tf: &TermFactory) -> bool {
        self.lhs.is_function() && tf.quasiprimitive(self.lhs) && !self.rhs.is_function()
    }

    /// Neither side mentions a function symbol anywhere
    pub fn function_free(self, tf: &TermFactory) -> bool {
        fn no_fun(tf: &TermFactory, t: Term) -> bool {
            !t.is_function() && tf.args(t).iter().all(|&a| no_fun(tf, a))
        }
        no_fun(tf, self.lhs) && no_fun(tf, self.rhs)
    }

    /// Rebuild both sides under a partial term map
    pub fn map_terms(
        self,
        tf: &mut TermFactory,
        theta: &mut impl FnMut(Term) -> Option<Term>,
    ) -> Literal {
        let lhs = tf.map_term(self.lhs, theta);
        let rhs = tf.map_term(self.rhs, theta);
        Literal::new(self.pos, lhs, rhs)
    }

    /// Rebuild with every occurrence of `old` replaced by `new`
    pub fn replace(self, tf: &mut TermFactory, old: Term, new: Term) -> Literal {
        let lhs = tf.replace(self.lhs, old, new);
        let rhs = tf.replace(self.rhs, old, new);
        Literal::new(self.pos, lhs, rhs)
    }

    /// Format with full term structure
    pub fn display(self, tf: &TermFactory) -> LiteralDisplay<'_> {
        LiteralDisplay { literal: self, factory: tf }
    }
}

// Left-term-major order, so that literals over the same left term cluster
// together; this is the order clauses are sorted by and binary-searched
// with.
impl Ord for Literal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lhs
            .cmp(&other.lhs)
            .then(self.pos.cmp(&other.pos))
            .then(self.rhs.cmp(&other.rhs))
    }
}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Display wrapper that resolves term structure through the factory
pub struct LiteralDisplay<'a> {
    literal: Literal,
    factory: &'a TermFactory,
}

impl fmt::Display for LiteralDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.factory.display(self.literal.lhs),
            if self.literal.pos { "=" } else { "≠" },
            self.factory.display(self.literal.rhs)
        )
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.lhs,
            if self.pos { "=" } else { "≠" },
            self.rhs
        )
    }
}
